//! Per-worker execution context.
//!
//! Every worker thread carries the identity of its pool, its capability to
//! own child pools, and a registry of its own. Pools built from inside a job
//! land in that registry and are shut down when the worker exits, so a
//! worker never touches the registry of the context that spawned it.

use crate::pool::registry::PoolRegistry;
use std::cell::RefCell;
use std::sync::Arc;

/// Identity of the worker running the current thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerInfo {
    /// ID of the pool owning the worker
    pub pool_id: u64,
    /// Index of the worker within its pool
    pub worker_id: usize,
    /// Whether the worker may construct pools of its own
    pub allows_child_work: bool,
}

pub(crate) struct WorkerContext {
    pub(crate) info: WorkerInfo,
    pub(crate) registry: Arc<PoolRegistry>,
}

thread_local! {
    static CURRENT: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

/// Install `context` for the calling worker thread.
pub(crate) fn enter(context: WorkerContext) {
    CURRENT.with(|current| *current.borrow_mut() = Some(context));
}

/// Remove and return the calling thread's context.
pub(crate) fn leave() -> Option<WorkerContext> {
    CURRENT
        .try_with(|current| current.borrow_mut().take())
        .ok()
        .flatten()
}

/// Identity of the worker running the calling thread, if any.
///
/// Returns `None` on threads that are not pool workers, including while
/// thread-local storage is being torn down.
pub fn current_worker() -> Option<WorkerInfo> {
    CURRENT
        .try_with(|current| current.borrow().as_ref().map(|ctx| ctx.info))
        .ok()
        .flatten()
}

/// Registry owned by the calling worker, if the thread is a worker.
pub(crate) fn worker_registry() -> Option<Arc<PoolRegistry>> {
    CURRENT
        .try_with(|current| {
            current
                .borrow()
                .as_ref()
                .map(|ctx| Arc::clone(&ctx.registry))
        })
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_plain_thread_has_no_context() {
        assert!(current_worker().is_none());
        assert!(worker_registry().is_none());
        assert!(leave().is_none());
    }

    #[test]
    fn test_enter_and_leave() {
        thread::spawn(|| {
            let registry = Arc::new(PoolRegistry::new());
            enter(WorkerContext {
                info: WorkerInfo {
                    pool_id: 11,
                    worker_id: 2,
                    allows_child_work: false,
                },
                registry: Arc::clone(&registry),
            });

            let info = current_worker().expect("context should be installed");
            assert_eq!(info.pool_id, 11);
            assert_eq!(info.worker_id, 2);
            assert!(!info.allows_child_work);
            assert!(Arc::ptr_eq(&worker_registry().unwrap(), &registry));

            assert!(leave().is_some());
            assert!(current_worker().is_none());
        })
        .join()
        .unwrap();
    }
}
