//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled, workers run inside `worker` spans,
//! each job runs inside a `job_execution` span (entered on the worker, but
//! parented to the span that was current at submission), and the pool emits
//! the trace-level metric events below.
//!
//! # Example
//!
//! ```rust,ignore
//! use pronto_utils::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("pronto_utils=debug".parse().unwrap()))
//!     .init();
//!
//! let pool = WorkerPool::new(4)?;
//! let ontologies = pool.map(load_ontology, sources)?;
//! ```

/// Metrics recording functions for observability.
///
/// These functions emit tracing events that can be consumed by
/// metrics collection systems via a tracing subscriber.
pub mod metrics {
    use std::time::Duration;

    /// Records a job submission event.
    #[inline]
    pub fn record_submission(queue_depth: usize) {
        tracing::trace!(
            counter.jobs_submitted = 1,
            gauge.queue_depth = queue_depth as i64,
            "job submitted"
        );
    }

    /// Records job completion with timing.
    #[inline]
    pub fn record_completion(duration: Duration, success: bool) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            tracing::trace!(
                counter.jobs_completed = 1,
                histogram.job_duration_ms = duration_ms,
                "job completed successfully"
            );
        } else {
            tracing::trace!(
                counter.jobs_failed = 1,
                histogram.job_duration_ms = duration_ms,
                "job failed"
            );
        }
    }

    /// Records a job panic event.
    #[inline]
    pub fn record_panic(duration: Duration) {
        tracing::trace!(
            counter.jobs_panicked = 1,
            histogram.job_duration_ms = duration.as_millis() as u64,
            "job panicked"
        );
    }

    /// Records worker becoming busy.
    #[inline]
    pub fn record_worker_busy(worker_id: usize) {
        tracing::trace!(gauge.workers_busy = 1, worker_id = worker_id, "worker busy");
    }

    /// Records worker becoming idle.
    #[inline]
    pub fn record_worker_idle(worker_id: usize) {
        tracing::trace!(gauge.workers_busy = -1i64, worker_id = worker_id, "worker idle");
    }

    /// Records pool startup.
    #[inline]
    pub fn record_pool_start(num_workers: usize, queue_type: &str) {
        tracing::info!(workers = num_workers, queue_type = queue_type, "worker pool started");
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_shutdown(jobs_processed: u64, jobs_failed: u64) {
        tracing::info!(
            jobs_processed = jobs_processed,
            jobs_failed = jobs_failed,
            "worker pool joined"
        );
    }
}
