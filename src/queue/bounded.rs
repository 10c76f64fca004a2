//! Bounded FIFO queue with capacity limit.

use super::{JobQueue, QueueError, QueueResult};
use crate::core::BoxedJob;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A bounded FIFO queue with configurable capacity.
///
/// Submitting to a full queue blocks the caller until a worker takes a job,
/// which keeps a burst of large parse jobs from piling up in memory.
///
/// # Example
///
/// ```rust
/// use pronto_utils::queue::{BoundedQueue, JobQueue, QueueError};
/// use pronto_utils::core::ClosureJob;
///
/// let queue = BoundedQueue::new(1);
/// queue.send(Box::new(ClosureJob::new(|| Ok(())))).unwrap();
///
/// let overflow = Box::new(ClosureJob::new(|| Ok(())));
/// assert_eq!(queue.try_send(overflow).unwrap_err(), QueueError::Full);
/// ```
pub struct BoundedQueue {
    sender: Sender<BoxedJob>,
    receiver: Receiver<BoxedJob>,
    capacity: usize,
    closed: AtomicBool,
}

impl BoundedQueue {
    /// Creates a new bounded queue with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (sender, receiver) = channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            closed: AtomicBool::new(false),
        }
    }
}

impl JobQueue for BoundedQueue {
    fn send(&self, job: BoxedJob) -> QueueResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.sender.send(job).map_err(|_| QueueError::Closed)
    }

    fn try_send(&self, job: BoxedJob) -> QueueResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Closed,
        })
    }

    fn try_recv(&self) -> QueueResult<BoxedJob> {
        match self.receiver.try_recv() {
            Ok(job) => Ok(job),
            Err(TryRecvError::Empty) if self.closed.load(Ordering::SeqCst) => {
                Err(QueueError::Disconnected)
            }
            Err(TryRecvError::Empty) => Err(QueueError::Empty),
            Err(TryRecvError::Disconnected) => Err(QueueError::Disconnected),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> QueueResult<BoxedJob> {
        if self.closed.load(Ordering::SeqCst) && self.receiver.is_empty() {
            return Err(QueueError::Disconnected);
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(job) => Ok(job),
            Err(channel::RecvTimeoutError::Timeout) => {
                if self.closed.load(Ordering::SeqCst) && self.receiver.is_empty() {
                    Err(QueueError::Disconnected)
                } else {
                    Err(QueueError::Empty)
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => Err(QueueError::Disconnected),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn len(&self) -> usize {
        self.receiver.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}
