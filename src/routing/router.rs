//! Middleware stack and registration API

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hyper::Method;

use super::layer::{Layer, MethodFilter, MountLayer, MountPrefix, RouteLayer};
use super::pattern::PathPattern;
use crate::error::PatternError;
use crate::handler::{BoxedErrorHandler, BoxedHandler, ErrorHandler, Handler};

/// Request-wide bounds applied by the router a request enters through.
/// Mounted routers inherit the bounds of their outermost parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    pub max_body_size: usize,
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// An ordered stack of layers plus its error pipeline
#[derive(Default)]
pub struct Router {
    pub(crate) layers: Vec<Layer>,
    pub(crate) error_handlers: Vec<BoxedErrorHandler>,
    pub(crate) limits: DispatchLimits,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("layers", &self.layers)
            .field("error_handlers", &self.error_handlers.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(mut self, limits: DispatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub const fn limits(&self) -> DispatchLimits {
        self.limits
    }

    /// Number of registered layers, mounts included
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Compile `path` and append a route layer
    pub fn register(
        &mut self,
        method: impl Into<MethodFilter>,
        path: &str,
        handler: impl Handler,
        parse_body: bool,
    ) -> Result<&mut Self, PatternError> {
        let pattern = PathPattern::parse(path)?;
        self.push_route(pattern, method.into(), Arc::new(handler), parse_body);
        Ok(self)
    }

    /// Compile `path` once and append one route layer per handler. They run
    /// in order, each continuing to the next, as if registered one by one.
    pub fn register_all<I>(
        &mut self,
        method: impl Into<MethodFilter>,
        path: &str,
        handlers: I,
        parse_body: bool,
    ) -> Result<&mut Self, PatternError>
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        let pattern = PathPattern::parse(path)?;
        let method = method.into();
        for handler in handlers {
            self.push_route(pattern.clone(), method.clone(), handler, parse_body);
        }
        Ok(self)
    }

    fn push_route(
        &mut self,
        pattern: PathPattern,
        method: MethodFilter,
        handler: BoxedHandler,
        parse_body: bool,
    ) {
        tracing::trace!(pattern = pattern.as_str(), ?method, "route registered");
        self.layers.push(Layer::Route(RouteLayer {
            pattern,
            method,
            handler,
            parse_body,
        }));
    }

    pub fn get(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::GET, path, handler, false)
    }

    /// POST route; the JSON body is parsed before the handler runs
    pub fn post(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::POST, path, handler, true)
    }

    /// PUT route; the JSON body is parsed before the handler runs
    pub fn put(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::PUT, path, handler, true)
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::DELETE, path, handler, false)
    }

    /// PATCH route; the JSON body is parsed before the handler runs
    pub fn patch(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::PATCH, path, handler, true)
    }

    pub fn head(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::HEAD, path, handler, false)
    }

    pub fn options(
        &mut self,
        path: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, PatternError> {
        self.register(Method::OPTIONS, path, handler, false)
    }

    /// Any method, body left unread
    pub fn all(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        self.register(MethodFilter::Any, path, handler, false)
    }

    /// Compile `path` once and register several verbs on it
    pub fn route(&mut self, path: &str) -> Result<Route<'_>, PatternError> {
        let pattern = PathPattern::parse(path)?;
        Ok(Route {
            router: self,
            pattern,
        })
    }

    /// Method-agnostic middleware for every path under `prefix`
    pub fn use_at(&mut self, prefix: &str, handler: impl Handler) -> Result<&mut Self, PatternError> {
        let pattern = PathPattern::parse_prefix(prefix)?;
        self.push_route(pattern, MethodFilter::Any, Arc::new(handler), false);
        Ok(self)
    }

    /// Middleware for every request
    pub fn use_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.push_route(PathPattern::any_path(), MethodFilter::Any, Arc::new(handler), false);
        self
    }

    /// Delegate every path under `prefix` to `child`, which sees the path
    /// with the prefix stripped
    pub fn mount(&mut self, prefix: &str, child: impl Into<Arc<Self>>) -> &mut Self {
        let prefix = MountPrefix::new(prefix);
        tracing::trace!(prefix = prefix.as_str(), "router mounted");
        self.layers.push(Layer::Mount(MountLayer {
            prefix,
            router: child.into(),
        }));
        self
    }

    /// Append to the error pipeline
    pub fn on_error(&mut self, handler: impl ErrorHandler) -> &mut Self {
        self.error_handlers.push(Arc::new(handler));
        self
    }
}

/// Verb builder for one compiled path, see [`Router::route`]
pub struct Route<'r> {
    router: &'r mut Router,
    pattern: PathPattern,
}

impl Route<'_> {
    fn add(&mut self, method: MethodFilter, handler: impl Handler, parse_body: bool) -> &mut Self {
        self.router
            .push_route(self.pattern.clone(), method, Arc::new(handler), parse_body);
        self
    }

    pub fn get(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::GET.into(), handler, false)
    }

    pub fn post(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::POST.into(), handler, true)
    }

    pub fn put(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::PUT.into(), handler, true)
    }

    pub fn delete(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::DELETE.into(), handler, false)
    }

    pub fn patch(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::PATCH.into(), handler, true)
    }

    pub fn head(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::HEAD.into(), handler, false)
    }

    pub fn options(&mut self, handler: impl Handler) -> &mut Self {
        self.add(Method::OPTIONS.into(), handler, false)
    }

    pub fn all(&mut self, handler: impl Handler) -> &mut Self {
        self.add(MethodFilter::Any, handler, false)
    }
}
