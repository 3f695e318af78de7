//! Injected key-value storage for response caching and rate limiting.
//!
//! Nothing here is process-global: callers construct a store and hand it to
//! the components that need it.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Boxed future returned by [`KeyValueStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal string key-value store with per-entry expiry.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](KeyValueStore::get) | Value for a live key |
/// | [`set`](KeyValueStore::set) | Insert or overwrite, optionally with a TTL |
/// | [`expire`](KeyValueStore::expire) | Reset the TTL of an existing key |
/// | [`delete`](KeyValueStore::delete) | Remove a key |
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// `ttl = None` uses the store's default TTL.
    fn set<'a>(&'a self, key: String, value: String, ttl: Option<Duration>) -> StoreFuture<'a, ()>;

    /// Returns `false` when the key is absent or already expired.
    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, bool>;

    /// Returns `true` when a key was removed.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;
}

#[derive(Debug, Clone)]
struct StoreEntry {
    value: String,
    expires_at: Instant,
}

impl StoreEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct StoreInner {
    map: HashMap<String, StoreEntry>,
    default_ttl: Duration,
}

impl StoreInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn is_disabled(&self) -> bool {
        self.default_ttl == Duration::ZERO
    }

    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn set(&mut self, key: String, value: String, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, StoreEntry { value, expires_at });
    }

    fn expire(&mut self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.map.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }
}

/// Thread-safe in-memory [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<tokio::sync::RwLock<StoreInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

impl MemoryStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(StoreInner::new(default_ttl))),
        }
    }

    /// Store with a default TTL of 5 minutes.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    /// Store without a default TTL. Writes that carry no explicit TTL are
    /// dropped; writes with one are kept for that long.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.is_disabled()
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        let now = Instant::now();
        store.map.retain(|_, entry| entry.is_live(now));
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { self.inner.read().await.get(key) })
    }

    fn set<'a>(&'a self, key: String, value: String, ttl: Option<Duration>) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.inner.write().await.set(key, value, ttl) })
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StoreFuture<'a, bool> {
        Box::pin(async move { self.inner.write().await.expire(key, ttl) })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { self.inner.write().await.map.remove(key).is_some() })
    }
}

/// `prefix:k1=v1&k2=v2` with keys in sorted order.
pub fn cache_key(prefix: &str, params: &BTreeMap<&str, String>) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{prefix}:{query}")
}
