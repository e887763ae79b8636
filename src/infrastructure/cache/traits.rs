//! # Cache Store Trait
//!
//! Port definition for the shared key/value cache.
//!
//! The store holds opaque string values under string keys with a per-entry
//! time-to-live. It offers no transactions; callers must tolerate lost or
//! interleaved writes. Bulk deletion goes through glob patterns where `*`
//! matches any run of characters.
//!
//! # Examples
//!
//! ```ignore
//! use remit_quotes::infrastructure::cache::traits::CacheStore;
//! use std::time::Duration;
//!
//! async fn warm(store: &impl CacheStore) {
//!     store.set("corridor:US:MX", "\"available\"".into(), Duration::from_secs(60)).await?;
//! }
//! ```

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error type for cache store operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The backing store rejected a command.
    #[error("Cache command error: {0}")]
    Command(String),

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a command error.
    #[must_use]
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns true if this is a connection error.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Shared key/value store with expiry.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Returns the value under `key`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be read.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be written.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Removes `key`. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be written.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Removes every key matching `pattern`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be scanned or written.
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Lists every live key matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be scanned.
    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Returns the name of the backend, for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Returns true if `key` matches the glob `pattern`.
///
/// Only `*` is special. Matching is case-sensitive.
#[must_use]
pub fn glob_matches(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let Some((first, rest)) = parts.split_first() else {
        return key.is_empty();
    };
    if rest.is_empty() {
        return key == *first;
    }
    let Some(mut remaining) = key.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return true;
    };
    for part in middle {
        match remaining.split_once(part) {
            Some((_, after)) => remaining = after,
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_exact() {
        assert!(glob_matches("corridor:US:MX", "corridor:US:MX"));
        assert!(!glob_matches("corridor:US:MX", "corridor:US:MXX"));
    }

    #[test]
    fn glob_trailing_star() {
        assert!(glob_matches("v1:fee:US:MX:*", "v1:fee:US:MX:USD:MXN:1000.0"));
        assert!(!glob_matches("v1:fee:US:MX:*", "v1:fee:US:GT:USD:GTQ:1000.0"));
    }

    #[test]
    fn glob_middle_star() {
        assert!(glob_matches("corridor:*:MX", "corridor:US:MX"));
        assert!(glob_matches("corridor:*:MX", "corridor:CA:MX"));
        assert!(!glob_matches("corridor:*:MX", "corridor:US:GT"));
    }

    #[test]
    fn glob_star_matches_everything() {
        assert!(glob_matches("*", "anything"));
        assert!(glob_matches("*", ""));
    }

    #[test]
    fn glob_prefix_and_suffix_do_not_overlap() {
        assert!(!glob_matches("ab*ba", "aba"));
        assert!(glob_matches("ab*ba", "abba"));
    }

    #[test]
    fn error_predicates() {
        assert!(CacheError::connection("refused").is_connection());
        assert!(!CacheError::command("WRONGTYPE").is_connection());
    }
}
