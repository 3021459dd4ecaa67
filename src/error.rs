//! Error types
//!
//! `Error` is what travels through a continuation into the error pipeline.
//! Route registration and server start-up have their own error types.

use std::time::Duration;
use thiserror::Error;

/// Boxed error accepted from handlers and body streams
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure raised while dispatching a single request
#[derive(Debug, Error)]
pub enum Error {
    /// A handler failed (returned `Err` from its future)
    #[error("{0}")]
    Handler(BoxError),

    /// A handler panicked while running
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    /// Body parsing failed for a layer that requested it
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// Buffered body exceeded `http.max_body_size`
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body stream failed, usually because the client went away
    #[error("failed to read request body: {0}")]
    BodyRead(BoxError),

    /// The per-request deadline expired
    #[error("request deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// A handler tried to set a header that is not valid HTTP
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    /// A JSON response body could not be serialized
    #[error("failed to serialize response body: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    /// Handler failure carrying only a message, the Rust counterpart of
    /// throwing `Error("bad input")`
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Handler(message.into().into())
    }

    /// Wrap any error raised inside a handler
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Handler(Box::new(err))
    }
}

/// Invalid route template, reported at registration time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("parameter name is empty in pattern '{pattern}'")]
    EmptyParamName { pattern: String },

    #[error("optional parameter ':{name}?' must be the last segment of '{pattern}'")]
    OptionalNotLast { pattern: String, name: String },

    #[error("wildcard '*' must be the last segment of '{pattern}'")]
    WildcardNotLast { pattern: String },
}

/// Start-up failure of the server binary
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("logger initialization failed: {0}")]
    Logger(String),

    #[error("route registration failed: {0}")]
    Pattern(#[from] PatternError),

    #[error("middleware setup failed: {0}")]
    Middleware(#[from] Error),

    #[error("password hashing setup failed: {0}")]
    Password(#[from] crate::password::PasswordError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
