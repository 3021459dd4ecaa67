//! Baseline security response headers

use futures::future::{self, BoxFuture, FutureExt};
use hyper::header::{HeaderName, HeaderValue};

use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Request, Response};

const HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
];

/// Sets the headers on every response passing through, then continues
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl Handler for SecurityHeaders {
    fn call<'a>(
        &'a self,
        _req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        for (name, value) in HEADERS {
            res.set_header(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        future::ready(Ok(Flow::Continue)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[tokio::test]
    async fn test_headers_set_and_continues() {
        let mut req = Request::new(Method::GET, "/");
        let mut res = Response::new();
        let flow = SecurityHeaders.call(&mut req, &mut res).await.unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(res.headers()["x-frame-options"], "DENY");
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(res.headers()["x-xss-protection"], "1; mode=block");
        assert!(!res.is_finished());
    }
}
