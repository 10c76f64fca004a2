//! Convenient re-exports for common types and traits

pub use crate::core::{
    BoxError, BoxedJob, ClosureJob, Job, JobHandle, JobResult, ProntoError, Result,
};
pub use crate::ident::{explicit_namespace, format_accession, NamespaceMap};
pub use crate::iter::{unique_everseen, unique_everseen_by, UniqueEverseenExt};
pub use crate::pool::{
    current_worker, Lifecycle, PoolConfig, PoolRegistry, PoolState, WorkerPool, WorkerStats,
};
