//! Routing module
//!
//! Path pattern compilation, the per-router middleware stack and the
//! dispatcher that walks it, including mounted child routers and the error
//! pipeline.

mod dispatch;
mod layer;
pub mod pattern;
mod router;

pub use layer::MethodFilter;
pub use pattern::{MatchMode, PathPattern, WILDCARD_PARAM};
pub use router::{DispatchLimits, Route, Router};
