//! Worker pool, its workers, and the registries that shut pools down

pub mod config;
pub mod context;
pub mod registry;
pub mod shutdown;
pub mod worker;
pub mod worker_pool;

pub use config::PoolConfig;
pub use context::{current_worker, WorkerInfo};
pub use registry::{Lifecycle, PoolRegistry, RegisteredPool};
pub use shutdown::shutdown_global;
pub use worker::WorkerStats;
pub use worker_pool::{MapResults, PoolState, UnorderedResults, WorkerPool};
