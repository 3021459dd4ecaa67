//! Bundled middlewares
//!
//! Each one is an ordinary [`Handler`](crate::handler::Handler) meant for
//! `Router::use_handler`. They continue the chain unless they answer the
//! request themselves (preflight, rate limit, static hit).

pub mod cors;
pub mod rate_limit;
pub mod request_logger;
pub mod security_headers;
pub mod session;
pub mod static_files;

pub use cors::Cors;
pub use rate_limit::{HitLog, RateLimit};
pub use request_logger::RequestLogger;
pub use security_headers::SecurityHeaders;
pub use session::{Session, SessionData, Sessions};
pub use static_files::ServeStatic;
