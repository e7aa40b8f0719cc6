use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Installs a SIGINT/SIGTERM handler that flips a shared flag. The
/// closure can run more than once (a second Ctrl-C during shutdown) but
/// `store` is idempotent, so there's no need for the fire-once plumbing a
/// non-atomic shutdown signal would require.
pub fn install_shutdown_handler() -> Arc<AtomicBool> {
    let stop_requested = Arc::new(AtomicBool::new(false));
    let flag = stop_requested.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        tracing::info!("received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!(error = %err, "failed to install signal handler, Ctrl-C will not trigger a graceful shutdown");
    }
    stop_requested
}
