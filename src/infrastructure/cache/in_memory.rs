//! # In-Memory Cache Store
//!
//! Process-local implementation of [`CacheStore`].
//!
//! Entries live in a `DashMap`; reads never block each other. Expired entries
//! are dropped lazily on read, by pattern deletes, and in bulk by
//! [`InMemoryCacheStore::purge_expired`], which
//! [`InMemoryCacheStore::spawn_cleanup`] runs on a timer.

use crate::infrastructure::cache::traits::{CacheResult, CacheStore, glob_matches};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A stored value with its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded value.
    pub value: String,
    /// When the entry was written.
    pub created_at: Instant,
    /// Time-to-live, jitter included.
    pub ttl: Duration,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Returns true once the entry has outlived its TTL.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// In-memory implementation of [`CacheStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry. Returns the number dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    /// Returns the remaining lifetime of `key`, if present and live.
    #[must_use]
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.ttl.saturating_sub(entry.created_at.elapsed()))
    }

    /// Purges expired entries every `every` until `shutdown` turns true or its
    /// sender is dropped.
    #[must_use]
    pub fn spawn_cleanup(&self, every: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }

                    _ = interval.tick() => {
                        let purged = store.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, remaining = store.len(), "expired cache entries purged");
                        }
                    }
                }
            }
            tracing::debug!("cache cleanup stopped");
        })
    }

    fn live_keys(&self, pattern: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired() && glob_matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        // The read guard must be gone before removing.
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        // Expired matches are removed too.
        let mut removed = 0u64;
        self.entries.retain(|key, _| {
            let hit = glob_matches(pattern, key);
            if hit {
                removed += 1;
            }
            !hit
        });
        Ok(removed)
    }

    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        Ok(self.live_keys(pattern))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_then_get_before_expiry() {
        let store = InMemoryCacheStore::new();
        store.set("k", "v".to_string(), MINUTE).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryCacheStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_removed() {
        let store = InMemoryCacheStore::new();
        store
            .set("k", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn set_replaces_value() {
        let store = InMemoryCacheStore::new();
        store.set("k", "old".to_string(), MINUTE).await.unwrap();
        store.set("k", "new".to_string(), MINUTE).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryCacheStore::new();
        store.set("k", "v".to_string(), MINUTE).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_pattern_only_touches_matches() {
        let store = InMemoryCacheStore::new();
        for key in [
            "v1:fee:US:MX:USD:MXN:100.0",
            "v1:fee:US:MX:USD:MXN:200.0",
            "v1:fee:US:GT:USD:GTQ:100.0",
            "corridor:US:MX",
        ] {
            store.set(key, "x".to_string(), MINUTE).await.unwrap();
        }

        let removed = store.delete_by_pattern("v1:fee:US:MX:*").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);
        assert!(store.get("corridor:US:MX").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_by_pattern_drops_expired_matches() {
        let store = InMemoryCacheStore::new();
        for i in 0..100 {
            store
                .set(&format!("v1:fee:US:MX:USD:MXN:{i}.0"), "x".to_string(), Duration::from_millis(1))
                .await
                .unwrap();
        }
        store.set("corridor:US:MX", "x".to_string(), MINUTE).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let removed = store.delete_by_pattern("v1:fee:*").await.unwrap();

        assert_eq!(removed, 100);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_task_purges_without_reads() {
        let store = InMemoryCacheStore::new();
        for i in 0..10 {
            store
                .set(&format!("k{i}"), "x".to_string(), Duration::from_millis(5))
                .await
                .unwrap();
        }
        store.set("live", "x".to_string(), MINUTE).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = store.spawn_cleanup(Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.len(), 1);
        assert!(store.ttl_remaining("live").is_some());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_task_stops_when_sender_dropped() {
        let store = InMemoryCacheStore::new();
        let (tx, rx) = watch::channel(false);
        let handle = store.spawn_cleanup(MINUTE, rx);
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn scan_keys_skips_expired() {
        let store = InMemoryCacheStore::new();
        store.set("a:1", "x".to_string(), MINUTE).await.unwrap();
        store
            .set("a:2", "x".to_string(), Duration::from_millis(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let keys = store.scan_keys("a:*").await.unwrap();
        assert_eq!(keys, vec!["a:1".to_string()]);
    }

    #[tokio::test]
    async fn purge_expired_counts_dropped() {
        let store = InMemoryCacheStore::new();
        store.set("live", "x".to_string(), MINUTE).await.unwrap();
        store
            .set("dead", "x".to_string(), Duration::from_millis(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.purge_expired(), 1);
        assert!(store.ttl_remaining("live").is_some());
        assert!(store.ttl_remaining("dead").is_none());
    }
}
