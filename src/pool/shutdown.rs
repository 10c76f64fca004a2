//! Process-exit hook for the process-wide pool registry.
//!
//! The hook is installed once, the first time the global registry is used.
//! It runs when the process exits normally, through `std::process::exit`,
//! or after `main` panics. Abrupt termination by signal is not covered.

use crate::core::error::panic_message;
use crate::pool::registry;
use std::panic::catch_unwind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INSTALL: Once = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Register the exit hook with the C runtime. Only the first call has an effect.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        // SAFETY: `run_at_exit` is a plain `extern "C" fn()` that never unwinds.
        let rc = unsafe { libc::atexit(run_at_exit) };
        if rc == 0 {
            INSTALLED.store(true, Ordering::Release);
            log::debug!("pool exit hook installed");
        } else {
            log::warn!("failed to install pool exit hook (atexit returned {})", rc);
        }
    });
}

/// Whether the exit hook is registered for this process
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// Shut down every pool in the process-wide registry.
///
/// Called by the exit hook; callers may also invoke it directly to clean up
/// early. Pools already handled are not closed or joined again.
pub fn shutdown_global() -> crate::core::Result<()> {
    match registry::global_if_initialized() {
        Some(registry) => registry.shutdown_all(),
        None => Ok(()),
    }
}

extern "C" fn run_at_exit() {
    match catch_unwind(shutdown_global) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("pool shutdown at exit failed: {}", e),
        Err(payload) => log::error!(
            "pool shutdown at exit panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}
