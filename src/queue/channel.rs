//! Unbounded FIFO queue using crossbeam channels.

use super::{JobQueue, QueueError, QueueResult};
use crate::core::BoxedJob;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// An unbounded FIFO queue using crossbeam channels.
///
/// This is the default queue of a [`WorkerPool`](crate::pool::WorkerPool);
/// submission never blocks.
///
/// # Example
///
/// ```rust
/// use pronto_utils::queue::{ChannelQueue, JobQueue};
/// use pronto_utils::core::ClosureJob;
///
/// let queue = ChannelQueue::unbounded();
/// queue.send(Box::new(ClosureJob::new(|| Ok(())))).unwrap();
/// assert_eq!(queue.len(), 1);
/// ```
pub struct ChannelQueue {
    sender: Sender<BoxedJob>,
    receiver: Receiver<BoxedJob>,
    closed: AtomicBool,
}

impl ChannelQueue {
    /// Creates a new unbounded channel queue.
    pub fn unbounded() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            closed: AtomicBool::new(false),
        }
    }
}

impl JobQueue for ChannelQueue {
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
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureJob;
    use std::sync::Arc;
    use std::thread;

    fn create_test_job() -> BoxedJob {
        Box::new(ClosureJob::new(|| Ok(())))
    }

    #[test]
    fn test_unbounded_send_recv() {
        let queue = ChannelQueue::unbounded();
        queue.send(create_test_job()).unwrap();
        let job = queue.try_recv().unwrap();
        assert_eq!(job.job_type(), "ClosureJob");
        assert_eq!(queue.capacity(), None);
    }

    #[test]
    fn test_recv_timeout_empty() {
        let queue = ChannelQueue::unbounded();
        assert_eq!(
            queue.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            QueueError::Empty
        );
    }

    #[test]
    fn test_close_drains_before_disconnect() {
        let queue = ChannelQueue::unbounded();
        queue.send(create_test_job()).unwrap();
        queue.close();
        assert!(queue.is_closed());

        assert_eq!(queue.send(create_test_job()).unwrap_err(), QueueError::Closed);
        assert!(queue.recv_timeout(Duration::from_millis(10)).is_ok());
        assert_eq!(
            queue.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            QueueError::Disconnected
        );
        assert_eq!(queue.try_recv().unwrap_err(), QueueError::Disconnected);
    }

    #[test]
    fn test_len_and_is_empty() {
        let queue = ChannelQueue::unbounded();
        assert!(queue.is_empty());

        queue.send(create_test_job()).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);

        queue.try_recv().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_send_recv() {
        let queue = Arc::new(ChannelQueue::unbounded());
        let num_jobs = 100;

        let mut handles = vec![];
        for _ in 0..4 {
            let q = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for _ in 0..num_jobs / 4 {
                    q.send(create_test_job()).unwrap();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let mut received = 0;
        while queue.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, num_jobs);
    }
}
