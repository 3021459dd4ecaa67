//! Access logging
//!
//! The middleware stamps the request with its start time and the line
//! format; once the response is complete the server calls [`complete`],
//! which writes one access line for every stamped request.

use std::sync::Arc;
use std::time::Instant;

use futures::future::{self, BoxFuture, FutureExt};

use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Request, Response};
use crate::logger::{self, AccessLogEntry};

/// Marker stored in request extensions
#[derive(Debug, Clone)]
pub struct AccessStamp {
    pub started: Instant,
    pub format: Arc<str>,
}

#[derive(Debug, Clone)]
pub struct RequestLogger {
    format: Arc<str>,
}

impl RequestLogger {
    /// `format` is `combined`, `common`, `json` or a custom pattern
    pub fn new(format: &str) -> Self {
        Self {
            format: Arc::from(format),
        }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new("combined")
    }
}

impl Handler for RequestLogger {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        req.extensions_mut().insert(AccessStamp {
            started: Instant::now(),
            format: Arc::clone(&self.format),
        });
        future::ready(Ok(Flow::Continue)).boxed()
    }
}

/// Access entry for a finished exchange, if the request was stamped
pub fn entry_for(req: &Request, res: &Response) -> Option<(AccessLogEntry, Arc<str>)> {
    let stamp = req.extensions().get::<AccessStamp>()?;
    let entry = AccessLogEntry::from_exchange(req, res, stamp.started.elapsed());
    Some((entry, Arc::clone(&stamp.format)))
}

/// Write the access line for a finished exchange
pub fn complete(req: &Request, res: &Response) {
    if let Some((entry, format)) = entry_for(req, res) {
        logger::log_access(&entry, &format);
    }
}
