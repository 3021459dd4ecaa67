//! Handler contracts
//!
//! A `Handler` runs for a matched layer and tells the dispatcher whether it
//! answered the request or wants traversal to go on. An `ErrorHandler` runs
//! in the error pipeline and either resolves the failure or passes an error on.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::Error;
use crate::http::{Request, Response};

/// What a handler wants the dispatcher to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The response is complete, stop traversal
    Responded,
    /// Resume with the next layer
    Continue,
}

pub type HandlerResult = Result<Flow, Error>;

pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response)
        -> BoxFuture<'a, HandlerResult>;
}

/// `Ok(())` resolves the request; `Err(e)` hands `e` to the next error handler
pub trait ErrorHandler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        err: Error,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

pub type BoxedHandler = Arc<dyn Handler>;
pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        (**self).call(req, res)
    }
}

/// Async closure handler, see [`handler_fn`]
pub struct HandlerFn<F>(F);

/// Wrap a closure returning a boxed future:
/// `handler_fn(|req, res| Box::pin(async move { ... }))`
pub const fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.0)(req, res)
    }
}

/// Synchronous closure handler, see [`handler_sync`]
pub struct HandlerSync<F>(F);

/// Wrap a plain closure that never awaits
pub const fn handler_sync<F>(f: F) -> HandlerSync<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    HandlerSync(f)
}

impl<F> Handler for HandlerSync<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        future::ready((self.0)(req, res)).boxed()
    }
}

pub struct ErrorHandlerFn<F>(F);

pub const fn error_handler_fn<F>(f: F) -> ErrorHandlerFn<F>
where
    F: for<'a> Fn(Error, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    ErrorHandlerFn(f)
}

impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: for<'a> Fn(Error, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        err: Error,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), Error>> {
        (self.0)(err, req, res)
    }
}

pub struct ErrorHandlerSync<F>(F);

pub const fn error_handler_sync<F>(f: F) -> ErrorHandlerSync<F>
where
    F: Fn(Error, &mut Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
{
    ErrorHandlerSync(f)
}

impl<F> ErrorHandler for ErrorHandlerSync<F>
where
    F: Fn(Error, &mut Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        err: Error,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), Error>> {
        future::ready((self.0)(err, req, res)).boxed()
    }
}
