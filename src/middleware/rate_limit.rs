//! Sliding-window rate limiting per client address

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, FutureExt};
use hyper::header::{self, HeaderValue};
use hyper::StatusCode;

use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Request, Response};
use crate::store::KeyedStore;

/// Request instants inside the current window, oldest first
pub type HitLog = Vec<Instant>;

pub struct RateLimit {
    window: Duration,
    max: usize,
    store: Arc<dyn KeyedStore<HitLog>>,
}

impl RateLimit {
    pub fn new(window: Duration, max: usize, store: Arc<dyn KeyedStore<HitLog>>) -> Self {
        Self { window, max, store }
    }

    /// Record a hit for `key`; false when the window is already full
    fn admit(&self, key: &str, now: Instant) -> bool {
        let mut admitted = false;
        let (window, max) = (self.window, self.max);
        self.store.update(key, Some(window), &mut |slot| {
            let hits = slot.get_or_insert_with(Vec::new);
            hits.retain(|at| now.duration_since(*at) < window);
            admitted = hits.len() < max;
            if admitted {
                hits.push(now);
            }
        });
        admitted
    }
}

fn client_key(req: &Request) -> String {
    req.remote_addr()
        .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
}

impl Handler for RateLimit {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        let key = client_key(req);
        let flow = if self.admit(&key, Instant::now()) {
            Flow::Continue
        } else {
            tracing::warn!(client = %key, "rate limit exceeded");
            res.status(StatusCode::TOO_MANY_REQUESTS).set_header(
                header::RETRY_AFTER,
                HeaderValue::from(self.window.as_secs().max(1)),
            );
            res.send_text("Too Many Requests");
            Flow::Responded
        };
        future::ready(Ok(flow)).boxed()
    }
}
