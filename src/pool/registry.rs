//! Bookkeeping of every pool created in an execution context.
//!
//! A registry only ever grows: pools are appended when they are built and
//! stay listed for the registry's lifetime. Entries hold weak references,
//! so a pool its owner already dropped (and therefore closed and joined)
//! is skipped at shutdown.

use crate::core::{ProntoError, Result};
use crate::pool::{context, shutdown};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// The close/join lifecycle a registry drives at shutdown.
///
/// Both operations must be idempotent.
pub trait Lifecycle: Send + Sync {
    /// Unique ID of the managed resource
    fn id(&self) -> u64;

    /// Stop accepting new work
    fn close(&self) -> Result<()>;

    /// Wait until all in-flight work has finished
    fn join(&self) -> Result<()>;
}

/// A registry entry
#[derive(Clone)]
pub struct RegisteredPool {
    id: u64,
    target: Weak<dyn Lifecycle>,
}

impl RegisteredPool {
    /// ID of the registered pool
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the pool is still referenced by anyone
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Close the pool; a no-op once it has been dropped
    pub fn close(&self) -> Result<()> {
        match self.target.upgrade() {
            Some(pool) => pool.close(),
            None => Ok(()),
        }
    }

    /// Join the pool; a no-op once it has been dropped
    pub fn join(&self) -> Result<()> {
        match self.target.upgrade() {
            Some(pool) => pool.join(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for RegisteredPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPool")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Registry of pools with two-phase shutdown
#[derive(Default)]
pub struct PoolRegistry {
    instances: Mutex<Vec<RegisteredPool>>,
    /// Number of leading entries already handled by `shutdown_all`
    settled: AtomicUsize,
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("instances", &self.len())
            .field("settled", &self.settled.load(Ordering::Acquire))
            .finish()
    }
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool.
    ///
    /// Returns `false` if a pool with the same ID is already listed.
    pub fn register_instance(&self, pool: &Arc<dyn Lifecycle>) -> bool {
        let id = pool.id();
        let mut instances = self.instances.lock();
        if instances.iter().any(|entry| entry.id == id) {
            return false;
        }
        instances.push(RegisteredPool {
            id,
            target: Arc::downgrade(pool),
        });
        true
    }

    /// Every pool ever registered, in registration order
    pub fn all_instances(&self) -> Vec<RegisteredPool> {
        self.instances.lock().clone()
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Whether no pool was ever registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close, then join, every pool not handled by an earlier call.
    ///
    /// All pools are closed first so they drain concurrently; joins follow
    /// in registration order. A failing pool never stops the others from
    /// being processed. The first failure is returned once every pool has
    /// been handled.
    pub fn shutdown_all(&self) -> Result<()> {
        let pending: Vec<Arc<dyn Lifecycle>> = {
            let instances = self.instances.lock();
            let start = self.settled.swap(instances.len(), Ordering::AcqRel);
            instances
                .iter()
                .skip(start)
                .filter_map(|entry| entry.target.upgrade())
                .collect()
        };

        if pending.is_empty() {
            return Ok(());
        }
        log::debug!("shutting down {} registered pool(s)", pending.len());

        let mut failures = Vec::new();
        for pool in &pending {
            if let Err(e) = pool.close() {
                log::error!("failed to close pool #{}: {}", pool.id(), e);
                failures.push(e);
            }
        }
        for pool in &pending {
            if let Err(e) = pool.join() {
                log::error!("failed to join pool #{}: {}", pool.id(), e);
                failures.push(e);
            }
        }

        let count = failures.len();
        match failures.into_iter().next() {
            Some(first) => Err(ProntoError::shutdown(count, first)),
            None => Ok(()),
        }
    }
}

static GLOBAL: OnceLock<Arc<PoolRegistry>> = OnceLock::new();

/// The process-wide registry.
///
/// First use installs the process-exit hook that shuts it down.
pub fn global() -> Arc<PoolRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| {
        shutdown::install();
        Arc::new(PoolRegistry::new())
    }))
}

/// The process-wide registry, if anything has used it yet
pub(crate) fn global_if_initialized() -> Option<&'static Arc<PoolRegistry>> {
    GLOBAL.get()
}

/// The registry new pools join by default: the calling worker's own
/// registry on a worker thread, the process-wide one everywhere else.
pub fn current() -> Arc<PoolRegistry> {
    context::worker_registry().unwrap_or_else(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    static NEXT_FAKE_ID: AtomicU64 = AtomicU64::new(1_000_000);

    #[derive(Default)]
    struct FakePool {
        id: u64,
        fail_close: bool,
        closes: AtomicUsize,
        joins: AtomicUsize,
    }

    impl FakePool {
        fn new(fail_close: bool) -> Arc<Self> {
            Arc::new(Self {
                id: NEXT_FAKE_ID.fetch_add(1, Ordering::Relaxed),
                fail_close,
                ..Default::default()
            })
        }
    }

    impl Lifecycle for FakePool {
        fn id(&self) -> u64 {
            self.id
        }

        fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(ProntoError::invalid_config("close", "refused"))
            } else {
                Ok(())
            }
        }

        fn join(&self) -> Result<()> {
            self.joins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn as_lifecycle(pool: &Arc<FakePool>) -> Arc<dyn Lifecycle> {
        Arc::clone(pool) as Arc<dyn Lifecycle>
    }

    #[test]
    fn test_register_once() {
        let registry = PoolRegistry::new();
        let pool = FakePool::new(false);

        assert!(registry.register_instance(&as_lifecycle(&pool)));
        assert!(!registry.register_instance(&as_lifecycle(&pool)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all_instances()[0].id(), pool.id);
    }

    #[test]
    fn test_shutdown_continues_past_failure() {
        let registry = PoolRegistry::new();
        let pools = vec![
            FakePool::new(false),
            FakePool::new(true),
            FakePool::new(false),
        ];
        for pool in &pools {
            registry.register_instance(&as_lifecycle(pool));
        }

        let err = registry.shutdown_all().unwrap_err();
        assert!(matches!(err, ProntoError::Shutdown { failures: 1, .. }));

        for pool in &pools {
            assert_eq!(pool.closes.load(Ordering::SeqCst), 1);
            assert_eq!(pool.joins.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_shutdown_handles_each_pool_once() {
        let registry = PoolRegistry::new();
        let first = FakePool::new(false);
        registry.register_instance(&as_lifecycle(&first));
        registry.shutdown_all().unwrap();

        let second = FakePool::new(false);
        registry.register_instance(&as_lifecycle(&second));
        registry.shutdown_all().unwrap();
        registry.shutdown_all().unwrap();

        assert_eq!(first.closes.load(Ordering::SeqCst), 1);
        assert_eq!(first.joins.load(Ordering::SeqCst), 1);
        assert_eq!(second.closes.load(Ordering::SeqCst), 1);
        assert_eq!(second.joins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_pools_are_skipped() {
        let registry = PoolRegistry::new();
        let pool = FakePool::new(false);
        registry.register_instance(&as_lifecycle(&pool));

        let entry = registry.all_instances().remove(0);
        assert!(entry.is_alive());
        drop(pool);
        assert!(!entry.is_alive());
        assert!(entry.close().is_ok());

        assert!(registry.shutdown_all().is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_current_is_global_off_worker() {
        assert!(Arc::ptr_eq(&current(), &global()));
        assert!(shutdown::is_installed());
    }
}
