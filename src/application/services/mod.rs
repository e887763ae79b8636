//! # Application Services
//!
//! Services that orchestrate domain logic and infrastructure.
//!
//! - [`normalizer`]: Canonical quote shape and provider dedup
//! - [`ranking_strategy`]: Sort keys, filters and ranking
//! - [`quote_aggregation`]: Concurrent provider fan-out
//! - [`tiered_cache`]: Exact, availability and corridor rate tiers
//! - [`persistence_sink`]: Durable quote upserts
//! - [`quote_service`]: Cache-first request orchestration

pub mod normalizer;
pub mod persistence_sink;
pub mod quote_aggregation;
pub mod quote_service;
pub mod ranking_strategy;
pub mod tiered_cache;

pub use persistence_sink::{PersistReport, PersistenceSink, WriteOrigin};
pub use quote_aggregation::{AggregationConfig, FetchOptions, QuoteAggregationEngine};
pub use quote_service::QuoteService;
pub use ranking_strategy::{RankedQuote, RankingStrategy, rank_results, sort_quotes};
pub use tiered_cache::{CacheStats, CacheStatsSnapshot, CacheTtlConfig, TieredCacheManager, TtlPolicy};
