//! Handles for retrieving job results

use crate::core::error::{ProntoError, Result};
use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A handle to the eventual result of a submitted job.
///
/// The result is delivered exactly once. Errors raised inside the job
/// surface here, at retrieval time, as [`ProntoError::JobExecution`] or
/// [`ProntoError::JobPanicked`].
///
/// # Example
///
/// ```
/// use pronto_utils::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(2)?;
/// let handle = pool.submit(|| Ok("GO:0008150".len()))?;
/// assert_eq!(handle.wait()?, 10);
/// # pool.close();
/// # pool.join()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JobHandle<T> {
    job_id: u64,
    receiver: Receiver<Result<T>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(job_id: u64, receiver: Receiver<Result<T>>) -> Self {
        Self { job_id, receiver }
    }

    /// Get the unique job ID
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Block until the job finishes and return its result
    pub fn wait(self) -> Result<T> {
        self.receiver
            .recv()
            .map_err(|_| ProntoError::ResultLost {
                job_id: self.job_id,
            })?
    }

    /// Wait at most `timeout` for the result.
    ///
    /// Returns `Ok(None)` if the job has not finished yet; the handle can be
    /// waited on again later.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ProntoError::ResultLost {
                job_id: self.job_id,
            }),
        }
    }

    /// Return the result if the job already finished
    pub fn try_wait(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ProntoError::ResultLost {
                job_id: self.job_id,
            })),
        }
    }
}
