//! Response context handed to handlers
//!
//! Collects status, headers and a single body; the server converts it into a
//! hyper response once dispatch is over.

use std::fmt;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::error::Error;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set (replace) a header
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Set (replace) a header given as strings
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self, Error> {
        let invalid = || Error::InvalidHeader {
            name: name.to_string(),
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        Ok(self.set_header(name, value))
    }

    /// Append one `Set-Cookie` line, keeping any already set
    pub fn append_cookie(&mut self, cookie: &Cookie) -> Result<&mut Self, Error> {
        let line = HeaderValue::from_str(&cookie.to_string()).map_err(|_| Error::InvalidHeader {
            name: header::SET_COOKIE.to_string(),
        })?;
        self.headers.append(header::SET_COOKIE, line);
        Ok(self)
    }

    /// Write the body and finish the response
    pub fn end(&mut self, body: impl Into<Bytes>) {
        if self.finished {
            tracing::debug!("response body emitted twice, keeping the last one");
        }
        self.body = body.into();
        self.finished = true;
    }

    /// Finish with an empty body
    pub fn finish(&mut self) {
        self.end(Bytes::new());
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.set_header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        self.end(text.into());
    }

    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let json = serde_json::to_vec(value).map_err(Error::Serialize)?;
        self.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_JSON),
        );
        self.end(json);
        Ok(())
    }

    /// Strings go out as text, everything else as JSON
    pub fn send(&mut self, value: serde_json::Value) -> Result<(), Error> {
        match value {
            serde_json::Value::String(text) => {
                self.send_text(text);
                Ok(())
            }
            other => self.send_json(&other),
        }
    }

    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Result<(), Error> {
        let value = HeaderValue::from_str(location).map_err(|_| Error::InvalidHeader {
            name: header::LOCATION.to_string(),
        })?;
        self.status(status).set_header(header::LOCATION, value);
        self.send_text(format!("Redirecting to {location}"));
        Ok(())
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Convert into the transport response
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// One `Set-Cookie` line: `name=value` followed by attributes in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    attributes: Vec<(String, Option<String>)>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: Vec::new(),
        }
    }

    /// `key=value` attribute
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), Some(value.into())));
        self
    }

    /// Bare attribute such as `HttpOnly`
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.attributes.push((key.into(), None));
        self
    }

    #[must_use]
    pub fn http_only(self) -> Self {
        self.flag("HttpOnly")
    }

    #[must_use]
    pub fn secure(self) -> Self {
        self.flag("Secure")
    }

    #[must_use]
    pub fn path(self, path: &str) -> Self {
        self.attr("Path", path)
    }

    #[must_use]
    pub fn max_age(self, age: Duration) -> Self {
        self.attr("Max-Age", age.as_secs().to_string())
    }

    #[must_use]
    pub fn same_site(self, policy: &str) -> Self {
        self.attr("SameSite", policy)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        for (key, value) in &self.attributes {
            match value {
                Some(v) => write!(f, "; {key}={v}")?,
                None => write!(f, "; {key}")?,
            }
        }
        Ok(())
    }
}
