//! Error types for pronto utilities

/// Result type for pronto utility operations
pub type Result<T> = std::result::Result<T, ProntoError>;

/// Type-erased error produced by a job body
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in pronto utilities
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProntoError {
    /// Namespace prefix could not be resolved
    #[error("No namespace registered for prefix '{prefix}' (in '{attr}')")]
    MissingPrefix {
        /// The prefix that was looked up
        prefix: String,
        /// The full attribute being resolved
        attr: String,
    },

    /// Pool constructed with a non-positive size
    #[error("Invalid pool size {size}: a pool needs at least one worker")]
    InvalidPoolSize {
        /// Requested number of workers
        size: usize,
    },

    /// Job submitted after the pool started closing
    #[error("Pool #{pool_id} is closed and does not accept new jobs")]
    PoolClosed {
        /// ID of the closed pool
        pool_id: u64,
    },

    /// `join` called before `close`
    #[error("Pool #{pool_id} is still open; close it before joining")]
    StillOpen {
        /// ID of the open pool
        pool_id: u64,
    },

    /// The job body returned an error
    #[error("Job execution failed (job_id: {job_id}): {source}")]
    JobExecution {
        /// ID of the failed job
        job_id: u64,
        /// Error returned by the job
        #[source]
        source: BoxError,
    },

    /// The job body panicked
    #[error("Job panicked (job_id: {job_id}): {message}")]
    JobPanicked {
        /// ID of the panicked job
        job_id: u64,
        /// Panic message
        message: String,
    },

    /// The job was dropped without producing a result
    #[error("Job {job_id} finished without delivering a result")]
    ResultLost {
        /// ID of the job
        job_id: u64,
    },

    /// A worker without the child-work capability tried to build a pool
    #[error("Worker #{worker_id} of pool #{pool_id} is not allowed to create child pools")]
    ChildWorkNotAllowed {
        /// Pool owning the worker
        pool_id: u64,
        /// Index of the worker within its pool
        worker_id: usize,
    },

    /// Failed to spawn a worker thread with details
    #[error("Failed to spawn worker #{worker_id}: {message}")]
    SpawnError {
        /// Index of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker #{worker_id}: {message}")]
    JoinError {
        /// Index of the worker that failed to join
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// One or more pools failed during shutdown
    #[error("{failures} pool(s) failed during shutdown; first failure: {first}")]
    Shutdown {
        /// Number of failed close/join calls
        failures: usize,
        /// The first failure encountered
        #[source]
        first: Box<ProntoError>,
    },
}

impl ProntoError {
    /// Create a missing prefix error
    pub fn missing_prefix(prefix: impl Into<String>, attr: impl Into<String>) -> Self {
        ProntoError::MissingPrefix {
            prefix: prefix.into(),
            attr: attr.into(),
        }
    }

    /// Create an invalid pool size error
    pub fn invalid_pool_size(size: usize) -> Self {
        ProntoError::InvalidPoolSize { size }
    }

    /// Create a pool closed error
    pub fn pool_closed(pool_id: u64) -> Self {
        ProntoError::PoolClosed { pool_id }
    }

    /// Create a still open error
    pub fn still_open(pool_id: u64) -> Self {
        ProntoError::StillOpen { pool_id }
    }

    /// Wrap an error returned by a job body
    pub fn job_execution(job_id: u64, source: impl Into<BoxError>) -> Self {
        ProntoError::JobExecution {
            job_id,
            source: source.into(),
        }
    }

    /// Create a job panicked error
    pub fn job_panicked(job_id: u64, message: impl Into<String>) -> Self {
        ProntoError::JobPanicked {
            job_id,
            message: message.into(),
        }
    }

    /// Create a child work not allowed error
    pub fn child_work_not_allowed(pool_id: u64, worker_id: usize) -> Self {
        ProntoError::ChildWorkNotAllowed { pool_id, worker_id }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ProntoError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        ProntoError::JoinError {
            worker_id,
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ProntoError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a shutdown error from the first failure and the failure count
    pub fn shutdown(failures: usize, first: ProntoError) -> Self {
        ProntoError::Shutdown {
            failures,
            first: Box::new(first),
        }
    }

    /// ID of the job this error belongs to, for job-level errors
    pub fn job_id(&self) -> Option<u64> {
        match self {
            ProntoError::JobExecution { job_id, .. }
            | ProntoError::JobPanicked { job_id, .. }
            | ProntoError::ResultLost { job_id } => Some(*job_id),
            _ => None,
        }
    }

    /// The error returned by the job body, if this is a job execution error.
    ///
    /// Downcast it to recover the job's own error type.
    pub fn job_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ProntoError::JobExecution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
