//! Job trait and related types

use crate::core::error::{panic_message, BoxError, ProntoError, Result};
use crossbeam::channel::Sender;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a unique job ID
pub(crate) fn next_job_id() -> u64 {
    NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed)
}

/// Result returned by a job body
pub type JobResult<T> = std::result::Result<T, BoxError>;

/// A trait representing a unit of work to be executed by a worker pool
pub trait Job: Send {
    /// Execute the job
    ///
    /// # Errors
    ///
    /// Returns an error if the job execution fails
    fn execute(&mut self) -> Result<()>;

    /// Get the job's type name for debugging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.job_type())
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match self.closure.take() {
            Some(closure) => closure(),
            None => Err(ProntoError::invalid_config(
                "job",
                "ClosureJob already executed - cannot execute twice",
            )),
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}

/// A job whose outcome is delivered to a [`JobHandle`](crate::core::JobHandle).
///
/// Panics in the body are caught here so the handle always receives an
/// outcome; the worker only sees the error for its statistics.
pub(crate) struct ResultJob<F, T>
where
    F: FnOnce() -> JobResult<T> + Send,
    T: Send,
{
    job_id: u64,
    closure: Option<F>,
    result_tx: Sender<Result<T>>,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<F, T> ResultJob<F, T>
where
    F: FnOnce() -> JobResult<T> + Send,
    T: Send,
{
    pub(crate) fn new(job_id: u64, closure: F, result_tx: Sender<Result<T>>) -> Self {
        Self {
            job_id,
            closure: Some(closure),
            result_tx,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }
}

impl<F, T> Job for ResultJob<F, T>
where
    F: FnOnce() -> JobResult<T> + Send,
    T: Send,
{
    fn execute(&mut self) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();

        let closure = match self.closure.take() {
            Some(closure) => closure,
            None => return Err(ProntoError::ResultLost { job_id: self.job_id }),
        };

        let (delivered, status) = match catch_unwind(AssertUnwindSafe(closure)) {
            Ok(Ok(value)) => (Ok(value), Ok(())),
            Ok(Err(source)) => {
                let message = source.to_string();
                (
                    Err(ProntoError::job_execution(self.job_id, source)),
                    Err(ProntoError::job_execution(self.job_id, message)),
                )
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                (
                    Err(ProntoError::job_panicked(self.job_id, message.clone())),
                    Err(ProntoError::job_panicked(self.job_id, message)),
                )
            }
        };

        // The handle may have been dropped; the job still counts as run.
        let _ = self.result_tx.send(delivered);
        status
    }

    fn job_type(&self) -> &str {
        "ResultJob"
    }
}
