//! Registered routing units

use std::fmt;
use std::sync::Arc;

use hyper::Method;

use super::pattern::PathPattern;
use super::router::Router;
use crate::handler::BoxedHandler;

/// Which request methods a layer accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(m) => m == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

/// A handler bound to a pattern and method filter
pub(crate) struct RouteLayer {
    pub(crate) pattern: PathPattern,
    pub(crate) method: MethodFilter,
    pub(crate) handler: BoxedHandler,
    pub(crate) parse_body: bool,
}

/// A child router delegated to under a literal prefix
pub(crate) struct MountLayer {
    pub(crate) prefix: MountPrefix,
    pub(crate) router: Arc<Router>,
}

pub(crate) enum Layer {
    Route(RouteLayer),
    Mount(MountLayer),
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route(route) => f
                .debug_struct("Route")
                .field("pattern", &route.pattern.as_str())
                .field("method", &route.method)
                .field("parse_body", &route.parse_body)
                .finish_non_exhaustive(),
            Self::Mount(mount) => f
                .debug_struct("Mount")
                .field("prefix", &mount.prefix.as_str())
                .finish_non_exhaustive(),
        }
    }
}

/// Literal mount prefix, always starting with `/` and never ending with one
/// unless it is the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MountPrefix(String);

impl MountPrefix {
    pub(crate) fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            Self("/".to_string())
        } else {
            Self(format!("/{trimmed}"))
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path seen by the child router, or `None` when the prefix does not
    /// cover `path` on a segment boundary
    pub(crate) fn rebase<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.is_root() {
            return Some(path);
        }
        match path.strip_prefix(self.0.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}
