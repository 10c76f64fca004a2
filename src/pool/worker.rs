//! Worker thread implementation

use crate::core::error::panic_message;
use crate::core::{BoxedJob, ProntoError, Result};
use crate::pool::context::{self, WorkerContext, WorkerInfo};
use crate::pool::registry::PoolRegistry;
use crate::queue::{JobQueue, QueueError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total number of jobs that completed successfully
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that returned an error
    pub jobs_failed: AtomicU64,
    /// Total number of jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Total time spent processing jobs (microseconds)
    pub total_processing_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, outcome: &Result<()>, elapsed: Duration) {
        let counter = match outcome {
            Ok(()) => &self.jobs_processed,
            Err(ProntoError::JobPanicked { .. }) => &self.jobs_panicked,
            Err(_) => &self.jobs_failed,
        };
        // Time first, so a reader that sees the count also sees its time.
        self.total_processing_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Release);
        counter.fetch_add(1, Ordering::Release);
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Acquire)
    }

    /// Get total jobs failed
    pub fn get_jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Get total jobs panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Get total time spent in jobs
    pub fn get_total_processing_time(&self) -> Duration {
        Duration::from_micros(self.total_processing_time_us.load(Ordering::Relaxed))
    }
}

/// Settings a worker is spawned with
#[derive(Debug, Clone)]
pub(crate) struct WorkerSpec {
    pub(crate) pool_id: u64,
    pub(crate) name_prefix: String,
    pub(crate) allows_child_work: bool,
    pub(crate) poll_interval: Duration,
}

/// A worker thread that processes jobs from a queue.
///
/// Workers are not background threads: a job may construct and fully use
/// a pool of its own (unless the pool forbids child work). Such nested
/// pools are registered with the worker's own registry and shut down when
/// the worker exits.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    pool_id: u64,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Create and start a new worker
    ///
    /// Workers exit once the queue is closed and empty, so every queued job
    /// runs before shutdown completes.
    pub(crate) fn new(id: usize, queue: Arc<dyn JobQueue>, spec: &WorkerSpec) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);
        let info = WorkerInfo {
            pool_id: spec.pool_id,
            worker_id: id,
            allows_child_work: spec.allows_child_work,
        };
        let poll_interval = spec.poll_interval;

        let thread = thread::Builder::new()
            .name(format!("{}-{}-{}", spec.name_prefix, spec.pool_id, id))
            .spawn(move || Self::run(info, queue, stats_clone, poll_interval))
            .map_err(|e| ProntoError::spawn_with_source(id, "Cannot create worker thread", e))?;

        Ok(Self {
            id,
            pool_id: spec.pool_id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    fn is_current_thread(&self) -> bool {
        context::current_worker()
            .map(|info| info.pool_id == self.pool_id && info.worker_id == self.id)
            .unwrap_or(false)
    }

    /// Join the worker thread
    ///
    /// Joining from the worker's own thread (a job waiting on its own pool)
    /// detaches instead of deadlocking.
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            if self.is_current_thread() {
                log::warn!(
                    "worker {} of pool #{} asked to join itself; detaching",
                    self.id,
                    self.pool_id
                );
                return Ok(());
            }
            thread
                .join()
                .map_err(|payload| ProntoError::join(self.id, panic_message(payload.as_ref())))?;
        }
        Ok(())
    }

    /// Main worker loop
    fn run(info: WorkerInfo, queue: Arc<dyn JobQueue>, stats: Arc<WorkerStats>, poll_interval: Duration) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", pool_id = info.pool_id, id = info.worker_id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        context::enter(WorkerContext {
            info,
            registry: Arc::new(PoolRegistry::new()),
        });
        log::trace!("worker {} of pool #{} started", info.worker_id, info.pool_id);

        loop {
            match queue.recv_timeout(poll_interval) {
                Ok(mut job) => {
                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_worker_busy(info.worker_id);

                    Self::execute_job(info.worker_id, &mut job, &stats);

                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_worker_idle(info.worker_id);
                }
                Err(QueueError::Empty) => continue,
                Err(_) => break,
            }
        }

        // Pools built by this worker's jobs are this worker's to clean up.
        if let Some(ctx) = context::leave() {
            if let Err(e) = ctx.registry.shutdown_all() {
                log::error!(
                    "worker {} of pool #{} failed to shut down its child pools: {}",
                    info.worker_id,
                    info.pool_id,
                    e
                );
            }
        }

        #[cfg(feature = "tracing")]
        debug!(
            jobs_processed = stats.get_jobs_processed(),
            jobs_failed = stats.get_jobs_failed(),
            "worker shutting down"
        );
        log::trace!("worker {} of pool #{} stopped", info.worker_id, info.pool_id);
    }

    /// Execute a single job with panic protection
    #[allow(unused_variables)]
    fn execute_job(id: usize, job: &mut BoxedJob, stats: &WorkerStats) {
        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job_execution", job_type = job.job_type());
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        let start = Instant::now();
        let outcome = match catch_unwind(AssertUnwindSafe(|| job.execute())) {
            Ok(outcome) => outcome,
            Err(payload) => Err(ProntoError::job_panicked(0, panic_message(payload.as_ref()))),
        };
        let elapsed = start.elapsed();

        if let Err(e) = &outcome {
            log::warn!("worker {}: {} job failed: {}", id, job.job_type(), e);
        }

        #[cfg(feature = "tracing")]
        match &outcome {
            Err(ProntoError::JobPanicked { .. }) => crate::tracing::metrics::record_panic(elapsed),
            other => crate::tracing::metrics::record_completion(elapsed, other.is_ok()),
        }

        stats.record(&outcome, elapsed);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // Bounded wait so Drop cannot hang forever
            const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

            if self.is_current_thread() {
                return;
            }

            let start = Instant::now();
            while !thread.is_finished() {
                if start.elapsed() >= JOIN_TIMEOUT {
                    log::warn!(
                        "worker {} of pool #{} did not finish within {}s during drop; detaching",
                        self.id,
                        self.pool_id,
                        JOIN_TIMEOUT.as_secs()
                    );
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }

            if let Err(payload) = thread.join() {
                log::error!(
                    "worker {} of pool #{} panicked during shutdown: {}",
                    self.id,
                    self.pool_id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}
