// Connection module
// Serves one TCP connection over HTTP/1.1 and feeds each request to the router

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::config::Config;
use crate::http::{Request, Response};
use crate::logger;
use crate::middleware::request_logger;
use crate::routing::Router;

const FALLBACK_SERVER_NAME: &str = "switchyard";

/// Per-connection transport settings derived from configuration
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    /// Whole-connection deadline; `None` disables it
    pub timeout: Option<Duration>,
    pub max_connections: Option<usize>,
    pub server_name: HeaderValue,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        let server_name = HeaderValue::from_str(&config.http.server_name).unwrap_or_else(|_| {
            tracing::warn!(
                name = %config.http.server_name,
                "server_name is not a valid header value"
            );
            HeaderValue::from_static(FALLBACK_SERVER_NAME)
        });
        Self {
            keep_alive: config.performance.keep_alive,
            timeout: config.connection_timeout(),
            max_connections: config.performance.max_connections,
            server_name,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            keep_alive: true,
            timeout: None,
            max_connections: None,
            server_name: HeaderValue::from_static(FALLBACK_SERVER_NAME),
        }
    }
}

/// Admit a connection if the limit allows it and serve it in a new task
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: &Arc<Router>,
    settings: &Arc<ConnectionSettings>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first so concurrent accepts cannot both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = settings.max_connections {
        if prev_count >= max_conn {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                active = prev_count,
                max = max_conn,
                peer = %peer_addr,
                "max connections reached, connection rejected"
            );
            drop(stream);
            return;
        }
    }

    tracing::trace!(peer = %peer_addr, "connection accepted");
    handle_connection(
        stream,
        peer_addr,
        Arc::clone(app),
        Arc::clone(settings),
        Arc::clone(conn_counter),
    );
}

fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: Arc<Router>,
    settings: Arc<ConnectionSettings>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(settings.keep_alive);

        let service_settings = Arc::clone(&settings);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let app = Arc::clone(&app);
                let settings = Arc::clone(&service_settings);
                async move { Ok::<_, Infallible>(serve_request(&app, &settings, req, peer_addr).await) }
            }),
        );

        match settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, conn).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => logger::log_connection_error(&err),
                Err(_) => tracing::debug!(
                    peer = %peer_addr,
                    secs = limit.as_secs(),
                    "connection timed out"
                ),
            },
            None => {
                if let Err(err) = conn.await {
                    logger::log_connection_error(&err);
                }
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run one request through the router and convert the finished response
async fn serve_request(
    app: &Router,
    settings: &ConnectionSettings,
    req: hyper::Request<Incoming>,
    peer_addr: SocketAddr,
) -> hyper::Response<Full<Bytes>> {
    let mut request = Request::from_hyper(req, Some(peer_addr));
    let mut response = Response::new();
    app.handle(&mut request, &mut response).await;

    if !response.headers().contains_key(header::SERVER) {
        response.set_header(header::SERVER, settings.server_name.clone());
    }
    request_logger::complete(&request, &response);
    response.into_hyper()
}
