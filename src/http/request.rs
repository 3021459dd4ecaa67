//! Request context handed to handlers
//!
//! Wraps the transport request with the routing state the dispatcher keeps
//! per request: working path (rebased inside mounts), params of the matched
//! layer, query parsed once, and the JSON body once a layer asked for it.

use std::collections::HashMap;
use std::net::SocketAddr;

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::http::Extensions;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Version};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BoxError, Error};

/// Type-erased request payload, consumed at most once
pub type Payload = UnsyncBoxBody<Bytes, BoxError>;

pub struct Request {
    method: Method,
    version: Version,
    original_url: String,
    pub(crate) path: String,
    pub(crate) base_path: String,
    query: HashMap<String, String>,
    pub(crate) params: HashMap<String, String>,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: Option<Value>,
    payload: Option<Payload>,
    extensions: Extensions,
}

impl Request {
    /// Build a request for `target` (path plus optional `?query`) without a payload
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method,
            version: Version::HTTP_11,
            original_url: target.to_string(),
            path: path.to_string(),
            base_path: String::new(),
            query,
            params: HashMap::new(),
            headers: HeaderMap::new(),
            remote_addr: None,
            body: None,
            payload: None,
            extensions: Extensions::new(),
        }
    }

    /// Adopt a hyper request; the body stays unread until a layer parses it
    pub fn from_hyper<B>(req: hyper::Request<B>, remote_addr: Option<SocketAddr>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

        let mut request = Self::new(parts.method, &target);
        request.version = parts.version;
        request.headers = parts.headers;
        request.extensions = parts.extensions;
        request.remote_addr = remote_addr;
        request.payload = Some(body.map_err(Into::into).boxed_unsync());
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Attach a fully-buffered payload
    #[must_use]
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.with_payload(
            Full::new(body.into())
                .map_err(|never| match never {})
                .boxed_unsync(),
        )
    }

    /// Attach a streaming payload
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    /// Working path without query; relative to the enclosing mount
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path and query exactly as received
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Concatenated prefixes of the mounts the request is currently inside
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub const fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of cookie `name` from the `Cookie` header(s)
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(hyper::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Parsed JSON body, present only after a body-parsing layer matched
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Deserialize the parsed body into `T`
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value = self.body.clone().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(Error::MalformedBody)
    }

    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Buffer the payload and parse it as JSON. An empty payload parses as
    /// `{}`. A body parsed by an earlier layer is reused.
    pub(crate) async fn buffer_json(&mut self, limit: usize) -> Result<(), Error> {
        if self.body.is_some() {
            return Ok(());
        }

        let bytes = match self.payload.take() {
            Some(payload) => {
                let collect: std::pin::Pin<
                    Box<dyn std::future::Future<Output = Result<_, BoxError>> + Send>,
                > = Box::pin(Limited::new(payload, limit).collect());
                collect
                    .await
                    .map_err(|e| {
                        if e.downcast_ref::<LengthLimitError>().is_some() {
                            Error::PayloadTooLarge { limit }
                        } else {
                            Error::BodyRead(e)
                        }
                    })?
                    .to_bytes()
            }
            None => Bytes::new(),
        };

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(Error::MalformedBody)?
        };
        self.body = Some(value);
        Ok(())
    }
}

/// Decode `a=1&b=two` into a map; a repeated key keeps its last value
fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("original_url", &self.original_url)
            .field("path", &self.path)
            .field("base_path", &self.base_path)
            .field("params", &self.params)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body_util::StreamBody;
    use hyper::body::Frame;

    #[test]
    fn test_new_splits_path_and_query() {
        let req = Request::new(Method::GET, "/search?q=rust+lang&page=2&page=3");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.original_url(), "/search?q=rust+lang&page=2&page=3");
        assert_eq!(req.query_param("q"), Some("rust lang"));
        assert_eq!(req.query_param("page"), Some("3"));
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let req = Request::new(Method::GET, "?x=1");
        assert_eq!(req.path(), "/");
        assert_eq!(req.query_param("x"), Some("1"));
    }

    #[test]
    fn test_from_hyper_keeps_headers() {
        let hyper_req = hyper::Request::builder()
            .method(Method::POST)
            .uri("http://localhost/users?active=true")
            .header("x-trace", "abc")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        let req = Request::from_hyper(hyper_req, None);
        assert_eq!(*req.method(), Method::POST);
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query_param("active"), Some("true"));
        assert_eq!(req.header("x-trace"), Some("abc"));
    }

    #[test]
    fn test_cookie_lookup() {
        let req = Request::new(Method::GET, "/")
            .with_header("cookie", "theme=dark; sid=abc123")
            .with_header("cookie", "lang=en");
        assert_eq!(req.cookie("sid"), Some("abc123"));
        assert_eq!(req.cookie("lang"), Some("en"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[tokio::test]
    async fn test_buffer_json_parses_body() {
        let mut req = Request::new(Method::POST, "/").with_body(r#"{"name":"ada"}"#);
        req.buffer_json(1024).await.unwrap();
        assert_eq!(req.body().unwrap()["name"], "ada");
    }

    #[tokio::test]
    async fn test_buffer_json_empty_is_object() {
        let mut req = Request::new(Method::POST, "/").with_body("");
        req.buffer_json(1024).await.unwrap();
        assert_eq!(req.body(), Some(&serde_json::json!({})));

        let mut no_payload = Request::new(Method::POST, "/");
        no_payload.buffer_json(1024).await.unwrap();
        assert!(no_payload.body().unwrap().is_object());
    }

    #[tokio::test]
    async fn test_buffer_json_malformed() {
        let mut req = Request::new(Method::POST, "/").with_body("{not json");
        let err = req.buffer_json(1024).await.unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[tokio::test]
    async fn test_buffer_json_too_large() {
        let mut req = Request::new(Method::POST, "/").with_body(vec![b' '; 64]);
        let err = req.buffer_json(16).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_buffer_json_aborted_stream() {
        let chunks: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"{\"a\":"))),
            Err("connection reset".into()),
        ];
        let payload = StreamBody::new(stream::iter(chunks)).boxed_unsync();
        let mut req = Request::new(Method::POST, "/").with_payload(payload);
        let err = req.buffer_json(1024).await.unwrap_err();
        assert!(matches!(err, Error::BodyRead(_)));
    }

    #[test]
    fn test_body_as_typed() {
        #[derive(serde::Deserialize)]
        struct Signup {
            email: String,
        }
        let mut req = Request::new(Method::POST, "/signup");
        req.body = Some(serde_json::json!({"email": "a@b.c"}));
        let signup: Signup = req.body_as().unwrap();
        assert_eq!(signup.email, "a@b.c");
    }
}
