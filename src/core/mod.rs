//! Core types and traits for pronto utilities

pub mod error;
pub mod handle;
pub mod job;

pub use error::{BoxError, ProntoError, Result};
pub use handle::JobHandle;
pub use job::{BoxedJob, ClosureJob, Job, JobResult};
