//! Fixed-window request limiter backed by a [`KeyValueStore`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::KeyValueStore;
use crate::UtcDateTime;

pub const DEFAULT_RATE_LIMIT: u32 = 60;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

const KEY_PREFIX: &str = "ratelimit";

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: UtcDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WindowEntry {
    count: u32,
    reset_at_ms: i64,
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    limit: u32,
    window: Duration,
    // Serializes read-modify-write of window entries.
    guard: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
            guard: Mutex::new(()),
        }
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Count one request from `identifier` at `now`.
    pub async fn check(&self, identifier: &str, now: UtcDateTime) -> RateLimitDecision {
        let _guard = self.guard.lock().await;
        let key = format!("{KEY_PREFIX}:{identifier}");
        let now_ms = now.unix_millis();
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);

        let current = self
            .store
            .get(&key)
            .await
            .and_then(|raw| serde_json::from_str::<WindowEntry>(&raw).ok())
            .filter(|entry| now_ms <= entry.reset_at_ms);

        let entry = match current {
            Some(entry) => WindowEntry {
                count: entry.count.saturating_add(1),
                reset_at_ms: entry.reset_at_ms,
            },
            None => WindowEntry {
                count: 1,
                reset_at_ms: now_ms.saturating_add(window_ms),
            },
        };

        if let Ok(raw) = serde_json::to_string(&entry) {
            let remaining_ms = u64::try_from(entry.reset_at_ms - now_ms).unwrap_or(0);
            let ttl = Duration::from_millis(remaining_ms.max(1));
            self.store.set(key, raw, Some(ttl)).await;
        }

        let reset_at = UtcDateTime::from_unix_millis(entry.reset_at_ms).unwrap_or(now);
        RateLimitDecision {
            allowed: entry.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_at,
        }
    }
}
