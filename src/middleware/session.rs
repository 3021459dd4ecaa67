//! Cookie-identified sessions

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Cookie, Request, Response};
use crate::store::KeyedStore;

pub type SessionData = Map<String, Value>;

pub const DEFAULT_COOKIE: &str = "sid";

/// Handle placed in request extensions; reads and writes go to the store
#[derive(Clone)]
pub struct Session {
    id: String,
    ttl: Option<Duration>,
    store: Arc<dyn KeyedStore<SessionData>>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.id)?.get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.store.update(&self.id, self.ttl, &mut |slot| {
            slot.get_or_insert_with(Map::new)
                .insert(key.to_string(), value.clone());
        });
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut removed = None;
        self.store.update(&self.id, self.ttl, &mut |slot| {
            if let Some(data) = slot {
                removed = data.remove(key);
            }
        });
        removed
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Assigns every request a session, issuing a new cookie when the client
/// has none or an unknown one
pub struct Sessions {
    cookie_name: String,
    ttl: Option<Duration>,
    store: Arc<dyn KeyedStore<SessionData>>,
}

impl Sessions {
    pub fn new(store: Arc<dyn KeyedStore<SessionData>>) -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE.to_string(),
            ttl: None,
            store,
        }
    }

    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub const fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    fn known_id(&self, req: &Request) -> Option<String> {
        let sid = req.cookie(&self.cookie_name)?;
        let mut alive = false;
        // Touch the entry so an active session keeps its ttl
        self.store.update(sid, self.ttl, &mut |slot| alive = slot.is_some());
        alive.then(|| sid.to_string())
    }
}

impl Handler for Sessions {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            let id = match self.known_id(req) {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4().simple().to_string();
                    self.store.put(&id, SessionData::new(), self.ttl);
                    res.append_cookie(
                        &Cookie::new(self.cookie_name.as_str(), id.as_str())
                            .http_only()
                            .path("/"),
                    )?;
                    tracing::debug!(session = %id, "session created");
                    id
                }
            };
            req.extensions_mut().insert(Session {
                id,
                ttl: self.ttl,
                store: Arc::clone(&self.store),
            });
            Ok(Flow::Continue)
        }
        .boxed()
    }
}
