// Signal handling module
//
// SIGTERM and SIGINT (Ctrl+C elsewhere) request a graceful shutdown: the
// accept loop stops and in-flight connections are left to finish.

use std::sync::Arc;

use tokio::sync::Notify;

/// Resolves when the process is asked to stop
pub async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "signal handlers unavailable, falling back to ctrl-c");
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
            _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("ctrl-c received, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

/// Spawn a task that fires `notify` once a shutdown signal arrives
pub fn watch_shutdown(notify: Arc<Notify>) {
    tokio::spawn(async move {
        shutdown_requested().await;
        notify.notify_one();
    });
}
