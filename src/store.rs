//! Keyed store for middleware state
//!
//! Sessions and rate-limit windows live behind `KeyedStore` so the
//! middlewares never own global maps. `MemoryStore` keeps entries in a
//! `DashMap` and drops expired ones lazily on access.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;

pub trait KeyedStore<V>: Send + Sync + 'static {
    /// Live value for `key`
    fn get(&self, key: &str) -> Option<V>;

    /// Insert or replace; `ttl` of `None` never expires
    fn put(&self, key: &str, value: V, ttl: Option<Duration>);

    /// Remove `key`, returning the value if it was still live
    fn expire(&self, key: &str) -> Option<V>;

    /// Read-modify-write `key` atomically. `f` sees the live value (or
    /// `None`); leaving `Some` stores it with `ttl` counted from now,
    /// leaving `None` removes the key. `f` must not call back into the store.
    fn update(&self, key: &str, ttl: Option<Duration>, f: &mut dyn FnMut(&mut Option<V>));
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        !matches!(self.expires_at, Some(at) if at <= now)
    }
}

#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: DashMap<String, Entry<V>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every live value, in no particular order
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

impl<V> KeyedStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    fn put(&self, key: &str, value: V, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), Entry::new(value, ttl, Instant::now()));
    }

    fn expire(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| entry.is_live(now).then_some(entry.value))
    }

    fn update(&self, key: &str, ttl: Option<Duration>, f: &mut dyn FnMut(&mut Option<V>)) {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let current = occupied.get_mut();
                let mut slot = current.is_live(now).then(|| current.value.clone());
                f(&mut slot);
                match slot {
                    Some(value) => *current = Entry::new(value, ttl, now),
                    None => {
                        occupied.remove();
                    }
                }
            }
            MapEntry::Vacant(vacant) => {
                let mut slot = None;
                f(&mut slot);
                if let Some(value) = slot {
                    vacant.insert(Entry::new(value, ttl, now));
                }
            }
        }
    }
}
