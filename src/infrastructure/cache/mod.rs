//! # Cache Stores
//!
//! Port and backends for the shared key/value cache.
//!
//! - [`traits`] - The [`CacheStore`] port and glob matching
//! - [`in_memory`] - `DashMap` backend
//! - [`redis_store`] - Redis backend

pub mod in_memory;
pub mod redis_store;
pub mod traits;

pub use in_memory::{CacheEntry, InMemoryCacheStore};
pub use redis_store::RedisCacheStore;
pub use traits::{CacheError, CacheResult, CacheStore, glob_matches};
