//! HTTP context layer
//!
//! Request and response types handed to handlers, plus the small protocol
//! helpers the bundled middlewares share.

pub mod cache;
pub mod mime;
pub mod request;
pub mod response;

pub use request::{Payload, Request};
pub use response::{Cookie, Response};
