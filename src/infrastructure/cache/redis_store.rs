//! # Redis Cache Store
//!
//! [`CacheStore`] backed by Redis through an auto-reconnecting
//! [`ConnectionManager`].
//!
//! Pattern operations walk the keyspace with `SCAN MATCH` so a bulk purge
//! never blocks the server the way `KEYS` would.

use crate::infrastructure::cache::traits::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::fmt;
use std::time::Duration;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Redis implementation of [`CacheStore`].
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Connects to `url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::connection(e.to_string()))?;
        Ok(Self {
            conn,
            key_prefix: String::new(),
        })
    }

    /// Namespaces every key under `prefix`.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let full_pattern = self.full_key(pattern);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

fn command_error(err: redis::RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() {
        CacheError::connection(err.to_string())
    } else {
        CacheError::command(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(self.full_key(key))
            .arg(value)
            .arg("EX")
            .arg(secs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let keys = self.scan(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let mut removed = 0u64;
        for chunk in keys.chunks(SCAN_BATCH) {
            let n: u64 = redis::cmd("DEL")
                .arg(chunk.to_vec())
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;
            removed += n;
        }
        Ok(removed)
    }

    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let keys = self.scan(pattern).await?;
        let prefix_len = self.key_prefix.len();
        Ok(keys
            .into_iter()
            .map(|k| k.get(prefix_len..).map_or_else(|| k.clone(), str::to_string))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
