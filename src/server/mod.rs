// Server module entry point
// Binds the listener, accepts connections until shutdown, hands requests to the router

pub mod connection;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;

pub use connection::ConnectionSettings;
pub use listener::bind_reusable;

use crate::config::Config;
use crate::error::ServerError;
use crate::logger;
use crate::routing::Router;
use connection::accept_connection;

/// Bind the configured address and serve `app` until SIGINT/SIGTERM
pub async fn serve(config: &Config, app: Arc<Router>) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let listener = bind_reusable(addr)?;
    logger::log_server_start(&listener.local_addr()?, config);

    let shutdown = Arc::new(Notify::new());
    signal::watch_shutdown(Arc::clone(&shutdown));

    run(
        listener,
        app,
        ConnectionSettings::from_config(config),
        async move { shutdown.notified().await },
    )
    .await
}

/// Accept loop over an already bound listener. Returns once `shutdown`
/// resolves; connections already accepted keep running in their tasks.
pub async fn run<F>(
    listener: TcpListener,
    app: Arc<Router>,
    settings: ConnectionSettings,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    let settings = Arc::new(settings);
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    accept_connection(stream, peer_addr, &app, &settings, &active_connections);
                }
                Err(e) => tracing::error!(error = %e, "failed to accept connection"),
            },
            () = &mut shutdown => {
                tracing::info!(
                    active = active_connections.load(Ordering::SeqCst),
                    "listener closed"
                );
                return Ok(());
            }
        }
    }
}
