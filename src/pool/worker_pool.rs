//! Worker pool implementation

use crate::core::job::{next_job_id, ResultJob};
use crate::core::{BoxedJob, ClosureJob, Job, JobHandle, JobResult, ProntoError, Result};
use crate::pool::config::PoolConfig;
use crate::pool::context;
use crate::pool::registry::{self, Lifecycle, PoolRegistry};
use crate::pool::worker::{Worker, WorkerSpec, WorkerStats};
use crate::queue::{BoundedQueue, ChannelQueue, JobQueue};
use crossbeam::channel;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const JOINED: u8 = 2;

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting jobs
    Open,
    /// No new jobs; in-flight and queued jobs are draining
    Closing,
    /// All workers have terminated
    Joined,
}

impl PoolState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            OPEN => PoolState::Open,
            CLOSING => PoolState::Closing,
            _ => PoolState::Joined,
        }
    }
}

/// Shared pool state driven by both the owner and the registry
struct PoolCore {
    id: u64,
    config: PoolConfig,
    queue: Arc<dyn JobQueue>,
    workers: Mutex<Vec<Worker>>,
    stats: Vec<Arc<WorkerStats>>,
    state: AtomicU8,
    /// Shared by submitters, exclusive while `join` drains the queue
    submit_gate: RwLock<()>,
    total_jobs_submitted: AtomicU64,
}

impl PoolCore {
    fn state(&self) -> PoolState {
        PoolState::from_raw(self.state.load(Ordering::Acquire))
    }

    fn enqueue(&self, job: BoxedJob) -> Result<()> {
        let _gate = self.submit_gate.read();
        if self.state() != PoolState::Open {
            return Err(ProntoError::pool_closed(self.id));
        }

        // `send` only fails once the queue is closed.
        self.queue
            .send(job)
            .map_err(|_| ProntoError::pool_closed(self.id))?;

        self.total_jobs_submitted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_submission(self.queue.len());
        Ok(())
    }
}

impl Lifecycle for PoolCore {
    fn id(&self) -> u64 {
        self.id
    }

    fn close(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.queue.close();
            log::debug!("pool #{} closing ({} jobs queued)", self.id, self.queue.len());
        }
        Ok(())
    }

    fn join(&self) -> Result<()> {
        if self.state() == PoolState::Open {
            return Err(ProntoError::still_open(self.id));
        }

        // Held for the whole join so concurrent joiners wait for completion.
        let mut workers = self.workers.lock();
        if self.state() == PoolState::Joined {
            return Ok(());
        }

        let first_error = join_workers(self.id, workers.drain(..));

        // Jobs that slipped in behind the close never ran; dropping them
        // turns their handles into `ResultLost`. The gate waits out any
        // submitter that passed the state check before the close.
        let _gate = self.submit_gate.write();
        let mut abandoned = 0usize;
        while self.queue.try_recv().is_ok() {
            abandoned += 1;
        }
        if abandoned > 0 {
            log::warn!("pool #{} dropped {} job(s) queued after close", self.id, abandoned);
        }

        self.state.store(JOINED, Ordering::Release);
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_shutdown(
            self.stats.iter().map(|s| s.get_jobs_processed()).sum(),
            self.stats.iter().map(|s| s.get_jobs_failed()).sum(),
        );
        log::debug!("pool #{} joined", self.id);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Join every worker, logging failures; returns the first one
fn join_workers(pool_id: u64, workers: impl IntoIterator<Item = Worker>) -> Option<ProntoError> {
    let mut first_error = None;
    for worker in workers {
        if let Err(e) = worker.join() {
            log::error!("pool #{}: {}", pool_id, e);
            first_error.get_or_insert(e);
        }
    }
    first_error
}

/// A fixed-size pool of workers for independent, possibly long-running jobs
/// such as loading ontology documents.
///
/// # Lifecycle
///
/// *open* → [`close`](Self::close) → *closing* → [`join`](Self::join) → *joined*.
/// Closing stops new submissions but lets queued and running jobs finish.
/// Dropping the pool closes and joins it.
///
/// Every pool registers itself on construction: with the process-wide
/// registry, or with the worker's own registry when built inside a job.
/// The registry closes and joins whatever is still alive when its context
/// ends (process exit, or worker exit).
///
/// # Example
///
/// ```
/// use pronto_utils::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(4)?;
/// let squares = pool.map(|x: u64| Ok(x * x), vec![1, 2, 3])?;
/// assert_eq!(squares, vec![1, 4, 9]);
///
/// pool.close();
/// pool.join()?;
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    core: Arc<PoolCore>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.core.id)
            .field("config", &self.core.config)
            .field("state", &self.core.state())
            .field(
                "total_jobs_submitted",
                &self.core.total_jobs_submitted.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `size` workers
    pub fn new(size: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(size))
    }

    /// Create a pool with one worker per CPU
    pub fn with_default_size() -> Result<Self> {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool registered with the current context's registry
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        Self::with_registry(config, &registry::current())
    }

    /// Create a pool registered with an explicit registry
    pub fn with_registry(config: PoolConfig, registry: &Arc<PoolRegistry>) -> Result<Self> {
        config.validate()?;

        if let Some(worker) = context::current_worker() {
            if !worker.allows_child_work {
                return Err(ProntoError::child_work_not_allowed(
                    worker.pool_id,
                    worker.worker_id,
                ));
            }
        }

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let queue: Arc<dyn JobQueue> = if config.max_queue_size > 0 {
            Arc::new(BoundedQueue::new(config.max_queue_size))
        } else {
            Arc::new(ChannelQueue::unbounded())
        };

        let spec = WorkerSpec {
            pool_id: id,
            name_prefix: config.thread_name_prefix.clone(),
            allows_child_work: config.allows_child_work,
            poll_interval: config.poll_interval,
        };
        let mut workers = Vec::with_capacity(config.size);
        for worker_id in 0..config.size {
            match Worker::new(worker_id, Arc::clone(&queue), &spec) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    queue.close();
                    join_workers(id, workers);
                    return Err(e);
                }
            }
        }
        let stats = workers.iter().map(Worker::stats).collect();

        let core = Arc::new(PoolCore {
            id,
            config,
            queue,
            workers: Mutex::new(workers),
            stats,
            state: AtomicU8::new(OPEN),
            submit_gate: RwLock::new(()),
            total_jobs_submitted: AtomicU64::new(0),
        });

        let lifecycle: Arc<dyn Lifecycle> = Arc::clone(&core) as Arc<dyn Lifecycle>;
        registry.register_instance(&lifecycle);

        log::debug!("pool #{} started with {} workers", id, core.config.size);
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(
            core.config.size,
            if core.config.max_queue_size > 0 { "bounded" } else { "unbounded" },
        );

        Ok(Self { core })
    }

    /// Unique pool ID
    pub fn id(&self) -> u64 {
        self.core.id
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.core.config.size
    }

    /// Configuration the pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.core.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.core.state()
    }

    /// Whether the pool accepts jobs
    pub fn is_open(&self) -> bool {
        self.state() == PoolState::Open
    }

    /// Submit a job and get a handle to its result.
    ///
    /// Blocks while a bounded queue is full. An error returned or panic
    /// raised by `f` surfaces from [`JobHandle::wait`].
    ///
    /// # Errors
    ///
    /// [`ProntoError::PoolClosed`] once [`close`](Self::close) has been called.
    pub fn submit<F, T>(&self, f: F) -> Result<JobHandle<T>>
    where
        F: FnOnce() -> JobResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let job_id = next_job_id();
        let (tx, rx) = channel::bounded(1);
        self.core
            .enqueue(Box::new(ResultJob::new(job_id, f, tx)))?;
        Ok(JobHandle::new(job_id, rx))
    }

    /// Submit a single-input job, e.g. one ontology locator to parse
    pub fn apply<F, I, T>(&self, f: F, input: I) -> Result<JobHandle<T>>
    where
        F: FnOnce(I) -> JobResult<T> + Send + 'static,
        I: Send + 'static,
        T: Send + 'static,
    {
        self.submit(move || f(input))
    }

    /// Run `f` over every item and collect the results in input order.
    ///
    /// Every item is submitted before waiting; the first job error (in
    /// input order) is returned. `items` must be finite.
    pub fn map<F, I, T, It>(&self, f: F, items: It) -> Result<Vec<T>>
    where
        F: Fn(I) -> JobResult<T> + Send + Sync + 'static,
        It: IntoIterator<Item = I>,
        I: Send + 'static,
        T: Send + 'static,
    {
        self.imap(f, items)?.collect()
    }

    /// Like [`map`](Self::map), but yields results lazily in input order.
    ///
    /// Submission is eager: every item is queued before this returns, so
    /// `items` must be finite, and with a bounded queue the call blocks
    /// until all but `max_queue_size` items have been picked up by workers.
    pub fn imap<F, I, T, It>(&self, f: F, items: It) -> Result<MapResults<T>>
    where
        F: Fn(I) -> JobResult<T> + Send + Sync + 'static,
        It: IntoIterator<Item = I>,
        I: Send + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        let handles = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.submit(move || (*f)(item))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MapResults {
            handles: handles.into_iter(),
        })
    }

    /// Like [`imap`](Self::imap), but yields results as jobs finish.
    ///
    /// Useful when each result can be used on its own, e.g. loading many
    /// ontologies and processing whichever is parsed first. Submission is
    /// eager, as with [`imap`](Self::imap).
    pub fn imap_unordered<F, I, T, It>(&self, f: F, items: It) -> Result<UnorderedResults<T>>
    where
        F: Fn(I) -> JobResult<T> + Send + Sync + 'static,
        It: IntoIterator<Item = I>,
        I: Send + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        let (tx, rx) = channel::unbounded();
        let mut pending = Vec::new();
        for item in items {
            let f = Arc::clone(&f);
            let job_id = next_job_id();
            let job = ResultJob::new(
                job_id,
                move || (*f)(item).map(|value| (job_id, value)),
                tx.clone(),
            );
            self.core.enqueue(Box::new(job))?;
            pending.push(job_id);
        }

        Ok(UnorderedResults {
            receiver: rx,
            pending,
        })
    }

    /// Submit a [`Job`] without a result handle; failures are logged and counted
    pub fn execute_job<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.core.enqueue(Box::new(job))
    }

    /// Submit a closure without a result handle
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.execute_job(ClosureJob::new(f))
    }

    /// Stop accepting jobs. Idempotent.
    pub fn close(&self) {
        // Closing a pool cannot fail; the Result exists for the registry.
        let _ = self.core.close();
    }

    /// Block until every worker has terminated. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`ProntoError::StillOpen`] if [`close`](Self::close) was not called
    /// - [`ProntoError::JoinError`] if a worker thread panicked
    pub fn join(&self) -> Result<()> {
        self.core.join()
    }

    /// Get total number of jobs submitted
    pub fn total_jobs_submitted(&self) -> u64 {
        self.core.total_jobs_submitted.load(Ordering::Relaxed)
    }

    /// Get current queue size (approximate)
    pub fn queue_size(&self) -> usize {
        self.core.queue.len()
    }

    /// Get statistics for all workers
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.core.stats.clone()
    }

    /// Get total jobs processed across all workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.core.stats.iter().map(|s| s.get_jobs_processed()).sum()
    }

    /// Get total jobs failed across all workers
    pub fn total_jobs_failed(&self) -> u64 {
        self.core.stats.iter().map(|s| s.get_jobs_failed()).sum()
    }

    /// Get total jobs panicked across all workers
    pub fn total_jobs_panicked(&self) -> u64 {
        self.core.stats.iter().map(|s| s.get_jobs_panicked()).sum()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
        if let Err(e) = self.join() {
            log::error!("failed to join pool #{} during drop: {}", self.core.id, e);
        }
    }
}

/// Results of [`WorkerPool::imap`], in input order
#[derive(Debug)]
pub struct MapResults<T> {
    handles: std::vec::IntoIter<JobHandle<T>>,
}

impl<T> Iterator for MapResults<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.handles.next().map(JobHandle::wait)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl<T> ExactSizeIterator for MapResults<T> {}

/// Results of [`WorkerPool::imap_unordered`], in completion order
#[derive(Debug)]
pub struct UnorderedResults<T> {
    receiver: channel::Receiver<Result<(u64, T)>>,
    /// Jobs whose outcome has not been yielded yet
    pending: Vec<u64>,
}

impl<T> UnorderedResults<T> {
    fn settle(&mut self, job_id: u64) {
        if let Some(pos) = self.pending.iter().position(|&id| id == job_id) {
            self.pending.swap_remove(pos);
        }
    }
}

impl<T> Iterator for UnorderedResults<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() {
            return None;
        }
        match self.receiver.recv() {
            Ok(Ok((job_id, value))) => {
                self.settle(job_id);
                Some(Ok(value))
            }
            Ok(Err(e)) => {
                match e.job_id() {
                    Some(job_id) => self.settle(job_id),
                    None => {
                        self.pending.pop();
                    }
                }
                Some(Err(e))
            }
            // Every remaining job was dropped unrun
            Err(_) => self.pending.pop().map(|job_id| Err(ProntoError::ResultLost { job_id })),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}

impl<T> ExactSizeIterator for UnorderedResults<T> {}
