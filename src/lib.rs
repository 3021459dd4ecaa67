//! HTTP routing and middleware dispatch on top of hyper.
//!
//! A [`Router`] is an ordered stack of route handlers, middlewares and
//! mounted child routers. Each request walks the stack until a handler
//! responds; errors skip ahead to the router's error pipeline.

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod middleware;
pub mod password;
pub mod routing;
pub mod server;
pub mod store;

pub use error::{Error, PatternError, ServerError};
pub use handler::{
    error_handler_fn, error_handler_sync, handler_fn, handler_sync, ErrorHandler, Flow, Handler,
    HandlerResult,
};
pub use http::{Cookie, Request, Response};
pub use routing::{DispatchLimits, MethodFilter, Router};
pub use store::{KeyedStore, MemoryStore};
