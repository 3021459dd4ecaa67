//! Demo application
//!
//! Wires the bundled middlewares from configuration, a `GET /hello` route
//! and an in-memory `/users` resource mounted as a child router. Passwords
//! posted to `/users` are stored only as argon2 hashes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::{Error, ServerError};
use crate::handler::{error_handler_sync, handler_fn, handler_sync, Flow};
use crate::middleware::{
    Cors, HitLog, RateLimit, RequestLogger, SecurityHeaders, ServeStatic, SessionData, Sessions,
};
use crate::password::PasswordHasher;
use crate::routing::Router;
use crate::store::{KeyedStore, MemoryStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: String,
}

impl NewUser {
    fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name is required")
        } else if self.password.is_empty() {
            Some("password is required")
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct UserDirectory {
    users: MemoryStore<User>,
    last_id: AtomicU64,
    hasher: PasswordHasher,
}

impl UserDirectory {
    fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: MemoryStore::default(),
            last_id: AtomicU64::new(0),
            hasher,
        }
    }

    fn list(&self) -> Vec<User> {
        let mut users = self.users.values();
        users.sort_by_key(|user| user.id);
        users
    }

    /// Hashing runs on the blocking pool
    async fn add(&self, new: NewUser) -> Result<User, Error> {
        let hasher = self.hasher.clone();
        let password = new.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(Error::handler)?
            .map_err(Error::handler)?;

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let user = User {
            id,
            name: new.name,
            email: new.email,
            password_hash,
        };
        self.users.put(&id.to_string(), user.clone(), None);
        Ok(user)
    }

    fn find(&self, id: &str) -> Option<User> {
        self.users.get(id)
    }
}

/// Stores backing the stateful middlewares, kept so expired entries can be
/// purged in the background
#[derive(Debug, Clone, Default)]
pub struct Stores {
    pub sessions: Arc<MemoryStore<SessionData>>,
    pub hits: Arc<MemoryStore<HitLog>>,
}

impl Stores {
    pub fn purge_expired(&self) -> usize {
        self.sessions.purge_expired() + self.hits.purge_expired()
    }
}

/// Assemble the application router from configuration
pub fn build(config: &Config) -> Result<(Router, Stores), ServerError> {
    let stores = Stores::default();
    let middleware = &config.middleware;
    let mut app = Router::new().with_limits(config.dispatch_limits());

    if config.logging.access_log {
        app.use_handler(RequestLogger::new(&config.logging.access_log_format));
    }
    if middleware.security_headers {
        app.use_handler(SecurityHeaders);
    }
    if middleware.cors.enabled {
        let cors = &middleware.cors;
        app.use_handler(
            Cors::new()
                .origin(&cors.origin)?
                .methods(&cors.methods)?
                .headers(&cors.headers)?
                .expose_headers(&cors.expose_headers)?
                .credentials(cors.credentials),
        );
    }
    if middleware.rate_limit.enabled {
        let limit = &middleware.rate_limit;
        app.use_handler(RateLimit::new(
            Duration::from_secs(limit.window_secs),
            limit.max,
            Arc::clone(&stores.hits) as Arc<dyn KeyedStore<HitLog>>,
        ));
    }
    if middleware.session.enabled {
        let session = &middleware.session;
        app.use_handler(
            Sessions::new(Arc::clone(&stores.sessions) as Arc<dyn KeyedStore<SessionData>>)
                .cookie_name(session.cookie_name.as_str())
                .ttl(session.ttl_secs.map(Duration::from_secs)),
        );
    }
    if let Some(ref dir) = middleware.static_dir {
        app.use_handler(ServeStatic::new(dir).index_files(middleware.index_files.clone()));
    }

    app.get(
        "/hello",
        handler_sync(|_req, res| {
            res.send_text("Hello World");
            Ok(Flow::Responded)
        }),
    )?;
    let hasher = PasswordHasher::from_config(&config.auth)?;
    app.mount("/users", users_router(hasher)?);
    app.on_error(error_handler_sync(|err, _req, res| {
        let status = match err {
            Error::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            other => return Err(other),
        };
        res.status(status).send(json!({ "error": err.to_string() }))
    }));

    Ok((app, stores))
}

fn users_router(hasher: PasswordHasher) -> Result<Router, ServerError> {
    let directory = Arc::new(UserDirectory::new(hasher));
    let mut users = Router::new();

    let list = Arc::clone(&directory);
    let add = Arc::clone(&directory);
    let find = directory;
    users
        .get(
            "/",
            handler_sync(move |_req, res| {
                res.send_json(&list.list())?;
                Ok(Flow::Responded)
            }),
        )?
        .post(
            "/",
            handler_fn(move |req, res| {
                let directory = Arc::clone(&add);
                Box::pin(async move {
                    let new: NewUser = req.body_as()?;
                    if let Some(message) = new.missing_field() {
                        res.status(StatusCode::BAD_REQUEST)
                            .send(json!({ "error": message }))?;
                        return Ok(Flow::Responded);
                    }
                    let user = directory.add(new).await?;
                    tracing::info!(id = user.id, "user created");
                    res.status(StatusCode::CREATED).send_json(&user)?;
                    Ok(Flow::Responded)
                })
            }),
        )?
        .get(
            "/:id",
            handler_sync(move |req, res| {
                match req.param("id").and_then(|id| find.find(id)) {
                    Some(user) => res.send_json(&user)?,
                    None => res
                        .status(StatusCode::NOT_FOUND)
                        .send(json!({ "error": "user not found" }))?,
                }
                Ok(Flow::Responded)
            }),
        )?;
    Ok(users)
}
