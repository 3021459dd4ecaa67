//! Dispatcher and error pipeline
//!
//! One traversal walks one router's stack with its own cursor. Each layer is
//! evaluated into a `LayerOutcome`; a mount layer rebases the working path
//! and runs the child's traversal, whose `Exit` becomes the parent's outcome.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use hyper::StatusCode;
use tokio::time::Instant;
use tracing::Instrument;

use super::layer::{Layer, MountLayer, RouteLayer};
use super::router::Router;
use crate::error::Error;
use crate::handler::Flow;
use crate::http::{Request, Response};

/// Result of evaluating a single layer
#[derive(Debug)]
pub(crate) enum LayerOutcome {
    Responded,
    Continue,
    ContinueWithError(Error),
    NotMatched,
}

/// How a traversal of one stack ended
#[derive(Debug)]
pub(crate) enum Exit {
    Responded,
    Exhausted,
    /// The stack's own error pipeline did not resolve the error
    Failed(Error),
}

/// Per-request bounds shared by every traversal of one request
#[derive(Debug, Clone, Copy)]
struct Budget {
    max_body_size: usize,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl Budget {
    fn starting_now(max_body_size: usize, timeout: Option<Duration>) -> Self {
        Self {
            max_body_size,
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Same limits with the deadline counted again from now. Error
    /// handlers run on this so a request that already timed out can
    /// still be answered.
    fn renewed(self) -> Self {
        Self::starting_now(self.max_body_size, self.timeout)
    }

    fn bounded<'a, T: Send + 'a>(
        self,
        fut: BoxFuture<'a, Result<T, Error>>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        match (self.deadline, self.timeout) {
            (Some(at), Some(timeout)) => async move {
                tokio::time::timeout_at(at, fut)
                    .await
                    .unwrap_or(Err(Error::Timeout(timeout)))
            }
            .boxed(),
            _ => fut,
        }
    }
}

impl Router {
    /// Dispatch one request. The response is always finished on return:
    /// 404 when nothing answered, 500 when an error went unhandled.
    pub async fn handle(&self, req: &mut Request, res: &mut Response) {
        let budget = Budget::starting_now(self.limits.max_body_size, self.limits.request_timeout);
        let span = tracing::debug_span!("dispatch", method = %req.method(), url = req.original_url());

        let exit = self.traverse(req, res, budget).instrument(span).await;
        match exit {
            Exit::Responded => {
                if !res.is_finished() {
                    res.finish();
                }
            }
            Exit::Exhausted => {
                if !res.is_finished() {
                    tracing::debug!(path = req.original_url(), "no layer answered");
                    res.status(StatusCode::NOT_FOUND).send_text("Not Found");
                }
            }
            Exit::Failed(err) => {
                tracing::error!(error = %err, url = req.original_url(), "unhandled error");
                res.status(StatusCode::INTERNAL_SERVER_ERROR)
                    .send_text(format!("Unhandled Error: {err}"));
            }
        }
    }

    /// Dispatch an owned request and hand back the finished response
    pub async fn respond(&self, mut req: Request) -> Response {
        let mut res = Response::new();
        self.handle(&mut req, &mut res).await;
        res
    }

    fn traverse<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        budget: Budget,
    ) -> BoxFuture<'a, Exit> {
        async move {
            let mut cursor = 0;
            while let Some(layer) = self.layers.get(cursor) {
                cursor += 1;
                let outcome = match layer {
                    Layer::Route(route) => Self::run_route(route, &mut *req, &mut *res, budget).await,
                    Layer::Mount(mount) => Self::run_mount(mount, &mut *req, &mut *res, budget).await,
                };
                match outcome {
                    LayerOutcome::NotMatched | LayerOutcome::Continue => {}
                    LayerOutcome::Responded => return Exit::Responded,
                    LayerOutcome::ContinueWithError(err) => {
                        return self.run_error_pipeline(err, req, res, budget).await;
                    }
                }
            }
            Exit::Exhausted
        }
        .boxed()
    }

    fn run_route<'a>(
        route: &'a RouteLayer,
        req: &'a mut Request,
        res: &'a mut Response,
        budget: Budget,
    ) -> BoxFuture<'a, LayerOutcome> {
        async move {
            if !route.method.allows(req.method()) {
                return LayerOutcome::NotMatched;
            }
            let params = match route.pattern.matches(&req.path) {
                Some(captures) => route.pattern.bind(&captures),
                None => return LayerOutcome::NotMatched,
            };
            req.params = params;

            if route.parse_body {
                let limit = budget.max_body_size;
                let buffered = budget.bounded(req.buffer_json(limit).boxed()).await;
                if let Err(err) = buffered {
                    return LayerOutcome::ContinueWithError(err);
                }
            }

            let handler = &route.handler;
            let call = guarded({
                let (req, res) = (&mut *req, &mut *res);
                async move { handler.call(req, res).await }.boxed()
            });
            let result = budget.bounded(call).await;
            match result {
                Ok(Flow::Responded) => LayerOutcome::Responded,
                Ok(Flow::Continue) if res.is_finished() => {
                    tracing::debug!(
                        pattern = route.pattern.as_str(),
                        "handler continued after responding, stopping"
                    );
                    LayerOutcome::Responded
                }
                Ok(Flow::Continue) => LayerOutcome::Continue,
                Err(err) => LayerOutcome::ContinueWithError(err),
            }
        }
        .boxed()
    }

    fn run_mount<'a>(
        mount: &'a MountLayer,
        req: &'a mut Request,
        res: &'a mut Response,
        budget: Budget,
    ) -> BoxFuture<'a, LayerOutcome> {
        async move {
            let rebased = match mount.prefix.rebase(&req.path) {
                Some(rest) => rest.to_string(),
                None => return LayerOutcome::NotMatched,
            };
            let saved_path = std::mem::replace(&mut req.path, rebased);
            let saved_base = req.base_path.len();
            if !mount.prefix.is_root() {
                req.base_path.push_str(mount.prefix.as_str());
            }

            let exit = mount.router.traverse(&mut *req, &mut *res, budget).await;

            req.path = saved_path;
            req.base_path.truncate(saved_base);

            match exit {
                Exit::Responded => LayerOutcome::Responded,
                Exit::Exhausted => LayerOutcome::Continue,
                Exit::Failed(err) => LayerOutcome::ContinueWithError(err),
            }
        }
        .boxed()
    }

    fn run_error_pipeline<'a>(
        &'a self,
        mut err: Error,
        req: &'a mut Request,
        res: &'a mut Response,
        budget: Budget,
    ) -> BoxFuture<'a, Exit> {
        async move {
            let budget = budget.renewed();
            for handler in &self.error_handlers {
                let call = guarded({
                    let (req, res) = (&mut *req, &mut *res);
                    async move { handler.call(err, req, res).await }.boxed()
                });
                let result = budget.bounded(call).await;
                match result {
                    Ok(()) => return Exit::Responded,
                    Err(_) if res.is_finished() => return Exit::Responded,
                    Err(next) => err = next,
                }
            }
            Exit::Failed(err)
        }
        .boxed()
    }
}

/// Run a handler future, turning a panic into `HandlerPanicked`
fn guarded<'a, T: Send + 'a>(
    fut: BoxFuture<'a, Result<T, Error>>,
) -> BoxFuture<'a, Result<T, Error>> {
    async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(%message, "handler panicked");
                Err(Error::HandlerPanicked(message))
            }
        }
    }
    .boxed()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use hyper::Method;

    use super::*;
    use futures::stream;
    use http_body_util::{BodyExt, StreamBody};
    use hyper::body::{Bytes, Frame};

    use crate::error::BoxError;
    use crate::handler::{error_handler_fn, error_handler_sync, handler_fn, handler_sync, Handler};
    use crate::routing::DispatchLimits;

    fn text(body: &'static str) -> impl Handler {
        handler_sync(move |_req, res| {
            res.send_text(body);
            Ok(Flow::Responded)
        })
    }

    fn record(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> impl Handler {
        let log = Arc::clone(log);
        handler_sync(move |_req, _res| {
            log.lock().unwrap().push(name.to_string());
            Ok(Flow::Continue)
        })
    }

    async fn get(router: &Router, target: &str) -> Response {
        router.respond(Request::new(Method::GET, target)).await
    }

    #[tokio::test]
    async fn test_hello_world() {
        let mut app = Router::new();
        app.get("/hello", text("Hello World")).unwrap();

        let res = get(&app, "/hello").await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.text(), "Hello World");
    }

    #[tokio::test]
    async fn test_no_match_is_404() {
        let mut app = Router::new();
        app.get("/hello", text("Hello World")).unwrap();

        let res = get(&app, "/nope").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.text(), "Not Found");

        let wrong_method = app.respond(Request::new(Method::DELETE, "/hello")).await;
        assert_eq!(wrong_method.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_query_string_is_ignored_for_matching() {
        let mut app = Router::new();
        app.get(
            "/search",
            handler_sync(|req, res| {
                res.send_text(req.query_param("q").unwrap_or_default().to_string());
                Ok(Flow::Responded)
            }),
        )
        .unwrap();

        assert_eq!(get(&app, "/search?q=hyper").await.text(), "hyper");
    }

    #[tokio::test]
    async fn test_registration_order_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();
        app.get("/x", record(&log, "first"))
            .unwrap()
            .get("/x", text("second"))
            .unwrap()
            .get("/x", text("third"))
            .unwrap();

        let res = get(&app, "/x").await;
        assert_eq!(res.text(), "second");
        assert_eq!(*log.lock().unwrap(), ["first"]);
    }

    #[tokio::test]
    async fn test_params_and_optional_absent() {
        let mut app = Router::new();
        app.get(
            "/a/:b?",
            handler_sync(|req, res| {
                res.send_text(format!("{:?}", req.param("b")));
                Ok(Flow::Responded)
            }),
        )
        .unwrap();

        assert_eq!(get(&app, "/a").await.text(), "None");
        assert_eq!(get(&app, "/a/x").await.text(), "Some(\"x\")");
        assert_eq!(get(&app, "/a/x/y").await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mounted_router_sees_rebased_path() {
        let mut users = Router::new();
        users
            .get(
                "/:id",
                handler_sync(|req, res| {
                    res.send_text(format!(
                        "id={} path={} base={}",
                        req.param("id").unwrap_or_default(),
                        req.path(),
                        req.base_path()
                    ));
                    Ok(Flow::Responded)
                }),
            )
            .unwrap();
        let mut app = Router::new();
        app.mount("/users", users);

        let res = get(&app, "/users/42").await;
        assert_eq!(res.text(), "id=42 path=/42 base=/users");
    }

    #[tokio::test]
    async fn test_mount_restores_path_and_continues_parent() {
        let mut child = Router::new();
        child.get("/only", text("child")).unwrap();
        let mut app = Router::new();
        app.mount("/api", child);
        app.all(
            "/api/:rest",
            handler_sync(|req, res| {
                res.send_text(format!("{} {}", req.path(), req.base_path().is_empty()));
                Ok(Flow::Responded)
            }),
        )
        .unwrap();

        assert_eq!(get(&app, "/api/only").await.text(), "child");
        assert_eq!(get(&app, "/api/other").await.text(), "/api/other true");
        assert_eq!(get(&app, "/apix").await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_mount_does_not_rebase() {
        let mut child = Router::new();
        child
            .get(
                "/users/:id",
                handler_sync(|req, res| {
                    res.send_text(req.path().to_string());
                    Ok(Flow::Responded)
                }),
            )
            .unwrap();
        let mut app = Router::new();
        app.mount("/", child);

        assert_eq!(get(&app, "/users/7").await.text(), "/users/7");
    }

    #[tokio::test]
    async fn test_nested_mounts_stack_base_path() {
        let mut inner = Router::new();
        inner
            .get(
                "/",
                handler_sync(|req, res| {
                    res.send_text(req.base_path().to_string());
                    Ok(Flow::Responded)
                }),
            )
            .unwrap();
        let mut outer = Router::new();
        outer.mount("/v1/", inner);
        let mut app = Router::new();
        app.mount("/api", outer);

        assert_eq!(get(&app, "/api/v1").await.text(), "/api/v1");
    }

    #[tokio::test]
    async fn test_use_handler_runs_for_every_path() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();
        app.use_handler(record(&log, "mw"));
        app.use_at("/admin", record(&log, "admin")).unwrap();
        app.get("/admin/panel", text("panel")).unwrap();
        app.get("/", text("home")).unwrap();

        assert_eq!(get(&app, "/").await.text(), "home");
        assert_eq!(get(&app, "/admin/panel").await.text(), "panel");
        assert_eq!(*log.lock().unwrap(), ["mw", "mw", "admin"]);
    }

    #[tokio::test]
    async fn test_error_skips_layers_and_runs_pipeline_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();
        app.get("/boom", handler_sync(|_req, _res| Err(Error::msg("bad"))))
            .unwrap();
        app.get("/boom", record(&log, "skipped")).unwrap();

        let first = Arc::clone(&log);
        app.on_error(error_handler_sync(move |err, _req, _res| {
            first.lock().unwrap().push(format!("first:{err}"));
            Err(Error::msg("worse"))
        }));
        let second = Arc::clone(&log);
        app.on_error(error_handler_sync(move |err, _req, res| {
            second.lock().unwrap().push(format!("second:{err}"));
            res.status(StatusCode::BAD_GATEWAY).send_text("handled");
            Ok(())
        }));

        let res = get(&app, "/boom").await;
        assert_eq!(res.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(*log.lock().unwrap(), ["first:bad", "second:worse"]);
    }

    #[tokio::test]
    async fn test_signup_error_handled_with_400() {
        let mut app = Router::new();
        app.post(
            "/signup",
            handler_sync(|_req, _res| Err(Error::msg("bad input"))),
        )
        .unwrap();
        app.on_error(error_handler_sync(|_err, _req, res| {
            res.status(StatusCode::BAD_REQUEST).finish();
            Ok(())
        }));

        let res = app
            .respond(Request::new(Method::POST, "/signup").with_body("{}"))
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(!res.text().contains("Unhandled"));
    }

    #[tokio::test]
    async fn test_unhandled_error_is_500_with_message() {
        let mut app = Router::new();
        app.get("/fail", handler_sync(|_req, _res| Err(Error::msg("db down"))))
            .unwrap();
        app.on_error(error_handler_sync(|err, _req, _res| Err(err)));

        let res = get(&app, "/fail").await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text(), "Unhandled Error: db down");
    }

    #[tokio::test]
    async fn test_child_error_reaches_parent_pipeline() {
        let mut child = Router::new();
        child
            .get("/x", handler_sync(|_req, _res| Err(Error::msg("child"))))
            .unwrap();
        child.on_error(error_handler_sync(|err, _req, res| {
            res.header("x-child-saw", &err.to_string())?;
            Err(err)
        }));
        let mut app = Router::new();
        app.mount("/c", child);
        app.on_error(error_handler_sync(|err, req, res| {
            res.status(StatusCode::IM_A_TEAPOT)
                .send_text(format!("{err} at {}", req.path()));
            Ok(())
        }));

        let res = get(&app, "/c/x").await;
        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(res.headers()["x-child-saw"], "child");
        assert_eq!(res.text(), "child at /c/x");
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let mut app = Router::new();
        app.get("/panic", handler_sync(|_req, _res| panic!("kaboom")))
            .unwrap();

        let res = get(&app, "/panic").await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.text().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_continue_after_response_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();
        app.use_handler(handler_sync(|_req, res| {
            res.send_text("early");
            Ok(Flow::Continue)
        }));
        app.use_handler(record(&log, "late"));

        assert_eq!(get(&app, "/").await.text(), "early");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_body_is_parsed_for_post() {
        let mut app = Router::new();
        app.route("/items")
            .unwrap()
            .get(text("list"))
            .post(handler_sync(|req, res| {
                let name = req.body().and_then(|b| b["name"].as_str()).unwrap_or("?");
                res.status(StatusCode::CREATED).send_text(name.to_string());
                Ok(Flow::Responded)
            }));

        let created = app
            .respond(Request::new(Method::POST, "/items").with_body(r#"{"name":"lamp"}"#))
            .await;
        assert_eq!(created.status_code(), StatusCode::CREATED);
        assert_eq!(created.text(), "lamp");
        assert_eq!(get(&app, "/items").await.text(), "list");
    }

    #[tokio::test]
    async fn test_malformed_body_enters_pipeline() {
        let mut app = Router::new();
        app.post("/items", text("unreachable")).unwrap();
        app.on_error(error_handler_sync(|err, _req, res| {
            let status = match err {
                Error::MalformedBody(_) => StatusCode::BAD_REQUEST,
                Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => return Err(err),
            };
            res.status(status).finish();
            Ok(())
        }));

        let bad = app
            .respond(Request::new(Method::POST, "/items").with_body("{oops"))
            .await;
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let app = app.with_limits(DispatchLimits {
            max_body_size: 4,
            request_timeout: None,
        });
        let big = app
            .respond(Request::new(Method::POST, "/items").with_body(r#"{"a":1}"#))
            .await;
        assert_eq!(big.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let mut app = Router::new().with_limits(DispatchLimits {
            max_body_size: 1024,
            request_timeout: Some(Duration::from_millis(50)),
        });
        app.get(
            "/slow",
            handler_fn(|_req, res| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    res.send_text("late");
                    Ok(Flow::Responded)
                })
            }),
        )
        .unwrap();
        app.on_error(error_handler_sync(|err, _req, res| match err {
            Error::Timeout(_) => {
                res.status(StatusCode::REQUEST_TIMEOUT).finish();
                Ok(())
            }
            other => Err(other),
        }));

        let res = get(&app, "/slow").await;
        assert_eq!(res.status_code(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_interleaved_requests_are_isolated() {
        let mut app = Router::new();
        app.get(
            "/echo/:id",
            handler_fn(|req, res| {
                Box::pin(async move {
                    let before = req.param("id").map(str::to_string);
                    for _ in 0..10 {
                        tokio::task::yield_now().await;
                    }
                    let after = req.param("id").map(str::to_string);
                    res.send_text(format!(
                        "{}:{}:{}",
                        before.unwrap_or_default(),
                        after.unwrap_or_default(),
                        req.query_param("n").unwrap_or_default()
                    ));
                    Ok(Flow::Responded)
                })
            }),
        )
        .unwrap();
        let app = Arc::new(app);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let res = get(&app, &format!("/echo/{i}?n={i}")).await;
                    (i, res.text())
                })
            })
            .collect();

        for task in tasks {
            let (i, body) = task.await.unwrap();
            assert_eq!(body, format!("{i}:{i}:{i}"));
        }
    }

    #[tokio::test]
    async fn test_optional_param_on_mounted_root() {
        let mut users = Router::new();
        users
            .get(
                "/:id?",
                handler_sync(|req, res| {
                    res.send_text(req.param("id").unwrap_or("all").to_string());
                    Ok(Flow::Responded)
                }),
            )
            .unwrap();
        let mut app = Router::new();
        app.mount("/users", users);

        assert_eq!(get(&app, "/users").await.text(), "all");
        assert_eq!(get(&app, "/users/7").await.text(), "7");
    }

    #[tokio::test]
    async fn test_async_error_handler_runs_after_timeout() {
        let mut app = Router::new().with_limits(DispatchLimits {
            max_body_size: 1024,
            request_timeout: Some(Duration::from_millis(30)),
        });
        app.get(
            "/slow",
            handler_fn(|_req, _res| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Flow::Continue)
                })
            }),
        )
        .unwrap();
        app.on_error(error_handler_fn(|err, _req, res| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                tokio::time::sleep(Duration::from_millis(1)).await;
                match err {
                    Error::Timeout(_) => {
                        res.status(StatusCode::GATEWAY_TIMEOUT).send_text("too slow");
                        Ok(())
                    }
                    other => Err(other),
                }
            })
        }));

        let res = get(&app, "/slow").await;
        assert_eq!(res.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(res.text(), "too slow");
    }

    fn body_failure_app(
        limits: DispatchLimits,
        ran: &Arc<Mutex<Vec<String>>>,
        seen: &Arc<Mutex<Vec<String>>>,
    ) -> Router {
        let mut app = Router::new().with_limits(limits);
        app.post("/upload", record(ran, "handler")).unwrap();
        let seen = Arc::clone(seen);
        app.on_error(error_handler_sync(move |err, _req, res| {
            let kind = match err {
                Error::BodyRead(_) => "body_read",
                Error::Timeout(_) => "timeout",
                _ => "other",
            };
            seen.lock().unwrap().push(kind.to_string());
            res.status(StatusCode::BAD_REQUEST).finish();
            Ok(())
        }));
        app
    }

    #[tokio::test]
    async fn test_aborted_upload_reaches_pipeline() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = body_failure_app(DispatchLimits::default(), &ran, &seen);

        let chunks: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"{\"name\":"))),
            Err("connection reset".into()),
        ];
        let payload = StreamBody::new(stream::iter(chunks)).boxed_unsync();
        let res = app
            .respond(Request::new(Method::POST, "/upload").with_payload(payload))
            .await;

        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(*seen.lock().unwrap(), ["body_read"]);
        assert!(ran.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_upload_times_out_into_pipeline() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let limits = DispatchLimits {
            max_body_size: 1024,
            request_timeout: Some(Duration::from_millis(30)),
        };
        let app = body_failure_app(limits, &ran, &seen);

        let stalled = stream::pending::<Result<Frame<Bytes>, BoxError>>();
        let payload = StreamBody::new(stalled).boxed_unsync();
        let res = app
            .respond(Request::new(Method::POST, "/upload").with_payload(payload))
            .await;

        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(*seen.lock().unwrap(), ["timeout"]);
        assert!(ran.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_chain_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();
        let chain: Vec<Arc<dyn Handler>> = vec![
            Arc::new(record(&log, "validate")),
            Arc::new(record(&log, "authorize")),
            Arc::new(text("created")),
        ];
        app.register_all(Method::GET, "/signup", chain, false).unwrap();

        assert_eq!(get(&app, "/signup").await.text(), "created");
        assert_eq!(*log.lock().unwrap(), ["validate", "authorize"]);
    }
}
