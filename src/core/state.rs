//! Process-wide run state.
//!
//! - `WATCHING`: is the watch loop running? (decides what Ctrl+C does)
//! - `SHUTDOWN`: has shutdown been requested?

use std::sync::atomic::{AtomicBool, Ordering};

/// The watch loop is running and polls `SHUTDOWN` itself.
static WATCHING: AtomicBool = AtomicBool::new(false);

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// - Before `set_watching()`: exit immediately (one-shot builds have
///   nothing to wind down)
/// - After `set_watching()`: set the flag and let the loop finish its
///   current rebuild
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if WATCHING.load(Ordering::SeqCst) {
            crate::log!("watch"; "shutting down...");
        } else {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Mark the watch loop as running.
pub fn set_watching(watching: bool) {
    WATCHING.store(watching, Ordering::SeqCst);
}

/// Check if shutdown has been requested
///
/// Relaxed is enough: the loop polls this between events.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
