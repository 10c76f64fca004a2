//! Job queues feeding the worker pool.
//!
//! - [`ChannelQueue`]: unbounded FIFO queue (default)
//! - [`BoundedQueue`]: FIFO queue with a capacity; senders block while it is full
//!
//! Both are built on crossbeam channels. Closing a queue stops new sends
//! while letting workers drain what is already queued.

mod bounded;
mod channel;

pub use bounded::BoundedQueue;
pub use channel::ChannelQueue;

use crate::core::BoxedJob;
use std::time::Duration;

/// Errors that can occur during queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is full (for bounded queues)
    Full,
    /// Queue is closed and not accepting new jobs
    Closed,
    /// Queue is empty (for try_recv or an expired recv_timeout)
    Empty,
    /// Queue is closed and drained
    Disconnected,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Full => write!(f, "queue is full"),
            QueueError::Closed => write!(f, "queue is closed"),
            QueueError::Empty => write!(f, "queue is empty"),
            QueueError::Disconnected => write!(f, "queue is disconnected"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Trait for job queue implementations.
///
/// All implementations must be `Send + Sync` so one queue can be shared by
/// the submitting side and every worker.
pub trait JobQueue: Send + Sync {
    /// Sends a job to the queue, blocking while a bounded queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed.
    fn send(&self, job: BoxedJob) -> QueueResult<()>;

    /// Attempts to send a job without blocking.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Full`] if the queue is full (bounded queues)
    /// - [`QueueError::Closed`] if the queue has been closed
    fn try_send(&self, job: BoxedJob) -> QueueResult<()>;

    /// Attempts to receive a job without blocking.
    ///
    /// - `Err(QueueError::Empty)` if no job was available
    /// - `Err(QueueError::Disconnected)` if the queue is closed and empty
    fn try_recv(&self) -> QueueResult<BoxedJob>;

    /// Receives a job with a timeout.
    ///
    /// - `Err(QueueError::Empty)` if no job was available within the timeout
    /// - `Err(QueueError::Disconnected)` if the queue is closed and empty
    fn recv_timeout(&self, timeout: Duration) -> QueueResult<BoxedJob>;

    /// Closes the queue, preventing new jobs from being sent.
    ///
    /// Jobs already in the queue can still be received.
    fn close(&self);

    /// Returns `true` if the queue has been closed.
    fn is_closed(&self) -> bool;

    /// Returns the current number of queued jobs (approximate).
    fn len(&self) -> usize;

    /// Returns `true` if the queue is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued jobs, `None` when unbounded.
    fn capacity(&self) -> Option<usize>;
}
