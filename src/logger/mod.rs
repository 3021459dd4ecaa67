//! Logger module
//!
//! Diagnostics go through `tracing` with an `EnvFilter` built from the
//! configured level (`RUST_LOG` wins when set). Access lines are rendered
//! from an `AccessLogEntry` and written by `writer`.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::ServerError;

/// Install the tracing subscriber and the access writer.
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> Result<(), ServerError> {
    writer::init(config.access_log_file.as_deref())
        .map_err(|e| ServerError::Logger(format!("access log: {e}")))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ServerError::Logger(format!("invalid level '{}': {e}", config.level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.error_log_file.as_deref() {
        Some(path) => {
            let file = writer::open_log_file(path)
                .map_err(|e| ServerError::Logger(format!("error log '{path}': {e}")))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| ServerError::Logger(e.to_string()))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("server listening on http://{addr}");
    tracing::info!(level = %config.logging.level, "log level");
    if let Some(workers) = config.server.workers {
        tracing::info!(workers, "worker threads");
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!(max, "connection limit");
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!(path = %path, "access log file");
    }
    if let Some(ref dir) = config.middleware.static_dir {
        tracing::info!(dir = %dir, "serving static files");
    }
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    tracing::warn!(error = %err, "failed to serve connection");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    writer::write_access(&entry.format(format));
}
