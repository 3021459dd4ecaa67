//! CORS headers and preflight short-circuit

use futures::future::{self, BoxFuture, FutureExt};
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};

use crate::error::Error;
use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Request, Response};

#[derive(Debug, Clone)]
pub struct Cors {
    origin: HeaderValue,
    methods: HeaderValue,
    headers: HeaderValue,
    credentials: bool,
    expose_headers: Option<HeaderValue>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origin: HeaderValue::from_static("*"),
            methods: HeaderValue::from_static("GET,POST,PUT,DELETE,PATCH,OPTIONS"),
            headers: HeaderValue::from_static("Content-Type,Authorization"),
            credentials: false,
            expose_headers: None,
        }
    }
}

fn value(name: &header::HeaderName, raw: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(raw).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}

impl Cors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: &str) -> Result<Self, Error> {
        self.origin = value(&header::ACCESS_CONTROL_ALLOW_ORIGIN, origin)?;
        Ok(self)
    }

    pub fn methods(mut self, methods: &str) -> Result<Self, Error> {
        self.methods = value(&header::ACCESS_CONTROL_ALLOW_METHODS, methods)?;
        Ok(self)
    }

    pub fn headers(mut self, headers: &str) -> Result<Self, Error> {
        self.headers = value(&header::ACCESS_CONTROL_ALLOW_HEADERS, headers)?;
        Ok(self)
    }

    #[must_use]
    pub const fn credentials(mut self, enabled: bool) -> Self {
        self.credentials = enabled;
        self
    }

    /// Empty input leaves the header unset
    pub fn expose_headers(mut self, headers: &str) -> Result<Self, Error> {
        self.expose_headers = if headers.is_empty() {
            None
        } else {
            Some(value(&header::ACCESS_CONTROL_EXPOSE_HEADERS, headers)?)
        };
        Ok(self)
    }

    fn apply(&self, res: &mut Response) {
        res.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone())
            .set_header(header::ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone())
            .set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
        if self.credentials {
            res.set_header(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(expose) = &self.expose_headers {
            res.set_header(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }
    }
}

impl Handler for Cors {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        self.apply(res);
        let flow = if *req.method() == Method::OPTIONS {
            res.status(StatusCode::NO_CONTENT).finish();
            Flow::Responded
        } else {
            Flow::Continue
        };
        future::ready(Ok(flow)).boxed()
    }
}
