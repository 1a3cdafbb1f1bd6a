//! In-memory TTL cache for validated upstream response bodies.
//!
//! Invalidation is check-on-read: an entry whose TTL has elapsed is treated
//! as absent the moment it is read. No background sweep is required;
//! [`CacheStore::clear_expired`] exists as an optional reclaim pass and does
//! not change observable semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe TTL map from opaque cache keys to raw response bodies.
///
/// The orchestrator only caches bodies that already decoded successfully, so
/// stored entries are always replayable to the caller's payload type. A reader
/// racing a writer for the same key observes either the old or the new entry
/// in full.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, treating an expired entry as absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.live(Instant::now()).then(|| entry.body.clone())
    }

    /// Store a body under `key` for `ttl`, unconditionally overwriting any
    /// previous entry. Concurrent writers race; the last writer's TTL wins.
    pub async fn put(&self, key: String, body: String, ttl: Duration) {
        let entry = CacheEntry {
            body,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    /// Drop entries whose TTL has elapsed. Purely a space reclaim; `get`
    /// already ignores expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.live(now));
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
