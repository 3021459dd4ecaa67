//! Static file serving
//!
//! Serves GET/HEAD requests from a directory. Paths that do not resolve to a
//! readable file under the root fall through to the next layer.

use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use tokio::fs;

use crate::error::Error;
use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{cache, mime, Request, Response};

#[derive(Debug, Clone)]
pub struct ServeStatic {
    root: PathBuf,
    index_files: Vec<String>,
}

impl ServeStatic {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_files: vec!["index.html".to_string()],
        }
    }

    /// Files tried, in order, when the path names a directory
    #[must_use]
    pub fn index_files(mut self, files: Vec<String>) -> Self {
        self.index_files = files;
        self
    }

    /// Map a request path to a file inside the root
    async fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        if request_path.split('/').any(|segment| segment == "..") {
            tracing::warn!(path = request_path, "path traversal attempt blocked");
            return None;
        }

        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(dir = %self.root.display(), error = %e, "static directory inaccessible");
                return None;
            }
        };

        let mut candidate = root.join(request_path.trim_start_matches('/'));
        if fs::metadata(&candidate).await.ok()?.is_dir() {
            candidate = self.find_index(&candidate).await?;
        }

        // Symlinks may still point outside the root
        let resolved = fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            tracing::warn!(
                path = request_path,
                target = %resolved.display(),
                "static path escapes root"
            );
            return None;
        }
        Some(resolved)
    }

    async fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        for name in &self.index_files {
            let path = dir.join(name);
            if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                return Some(path);
            }
        }
        None
    }

    async fn serve(
        res: &mut Response,
        file: &Path,
        if_none_match: Option<String>,
        head_only: bool,
    ) -> Result<(), Error> {
        let content = fs::read(file).await?;
        let etag = cache::generate_etag(&content);
        let etag_value = HeaderValue::from_str(&etag).map_err(|_| Error::InvalidHeader {
            name: header::ETAG.to_string(),
        })?;
        res.set_header(header::ETAG, etag_value);

        if cache::etag_matches(if_none_match.as_deref(), &etag) {
            res.status(StatusCode::NOT_MODIFIED).finish();
            return Ok(());
        }

        res.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(mime::content_type_for(file)),
        );
        if head_only {
            res.set_header(header::CONTENT_LENGTH, HeaderValue::from(content.len()));
            res.finish();
        } else {
            res.end(content);
        }
        Ok(())
    }
}

impl Handler for ServeStatic {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            if !matches!(*req.method(), Method::GET | Method::HEAD) {
                return Ok(Flow::Continue);
            }
            let path = req.path().to_string();
            let Some(file) = self.resolve(&path).await else {
                return Ok(Flow::Continue);
            };
            let if_none_match = req.header(header::IF_NONE_MATCH.as_str()).map(str::to_string);
            let head_only = *req.method() == Method::HEAD;
            Self::serve(res, &file, if_none_match, head_only).await?;
            Ok(Flow::Responded)
        }
        .boxed()
    }
}
