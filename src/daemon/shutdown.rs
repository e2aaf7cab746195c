//! # OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when the
//! process receives a termination signal, and [`spawn_signal_watcher`], which
//! turns that into a cancellation of the daemon's shutdown token.
//!
//! ## Signals
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by service managers)
//! - `SIGHUP` (controlling terminal went away)
//! - `SIGQUIT`

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => tracing::info!("SIGINT received"),
        _ = sigterm.recv() => tracing::info!("SIGTERM received"),
        _ = sighup.recv()  => tracing::info!("SIGHUP received"),
        _ = sigquit.recv() => tracing::info!("SIGQUIT received"),
    }
    Ok(())
}

/// Spawns a task that cancels `shutdown` on the first termination signal.
///
/// Registration errors are reported through the returned handle; the token is
/// left untouched in that case.
pub fn spawn_signal_watcher(shutdown: CancellationToken) -> JoinHandle<Result<(), DaemonError>> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown_signal() => {
                res.map_err(DaemonError::Signal)?;
                shutdown.cancel();
                Ok(())
            }
            _ = shutdown.cancelled() => Ok(()),
        }
    })
}
