//! # Tiered Cache Manager
//!
//! Three cache tiers in front of the provider fan-out:
//!
//! | Tier         | Key                                             | Value                   |
//! |--------------|-------------------------------------------------|-------------------------|
//! | Exact quote  | `v1:fee:{sc}:{dc}:{scur}:{dcur}:{amount}`       | [`AggregateResponse`]   |
//! | Availability | `corridor:{sc}:{dc}`                            | [`CorridorAvailability`]|
//! | Corridor rate| `corridor_rate:{sc}:{dc}:{scur}:{dcur}`         | [`CorridorRateSnapshot`]|
//!
//! Every write carries a jittered TTL so entries written together do not
//! expire together.
//!
//! The manager fails open: a store error is logged and reads as a miss, and a
//! value that no longer decodes is deleted and reads as a miss.

use crate::domain::entities::aggregate_response::AggregateResponse;
use crate::domain::entities::rate_snapshot::CorridorRateSnapshot;
use crate::domain::value_objects::amount::SendAmount;
use crate::domain::value_objects::corridor::{CountryCode, Corridor};
use crate::domain::value_objects::enums::CorridorAvailability;
use crate::infrastructure::cache::{CacheResult, CacheStore};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Prefix of exact quote keys.
pub const EXACT_PREFIX: &str = "v1:fee";
/// Prefix of corridor availability keys.
pub const AVAILABILITY_PREFIX: &str = "corridor";
/// Prefix of corridor rate keys.
pub const RATE_PREFIX: &str = "corridor_rate";

/// Shortest TTL ever written.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Exact quote key for `(corridor, amount)`.
#[must_use]
pub fn exact_key(corridor: &Corridor, amount: SendAmount) -> String {
    format!(
        "{EXACT_PREFIX}:{}:{}:{}:{}:{}",
        corridor.source_country().as_str(),
        corridor.dest_country().as_str(),
        corridor.source_currency().as_str(),
        corridor.dest_currency().as_str(),
        amount.cache_repr()
    )
}

/// Availability key for the country pair of `corridor`.
#[must_use]
pub fn availability_key(corridor: &Corridor) -> String {
    format!(
        "{AVAILABILITY_PREFIX}:{}:{}",
        corridor.source_country().as_str(),
        corridor.dest_country().as_str()
    )
}

/// Corridor rate key for `corridor`.
#[must_use]
pub fn rate_key(corridor: &Corridor) -> String {
    format!(
        "{RATE_PREFIX}:{}:{}:{}:{}",
        corridor.source_country().as_str(),
        corridor.dest_country().as_str(),
        corridor.source_currency().as_str(),
        corridor.dest_currency().as_str()
    )
}

/// Returns `base` shifted by a uniform offset in `[-jitter, +jitter]`, never
/// below [`MIN_TTL`].
#[must_use]
pub fn jittered_ttl(base: Duration, jitter: Duration) -> Duration {
    let base_ms = i64::try_from(base.as_millis()).unwrap_or(i64::MAX);
    let jitter_ms = i64::try_from(jitter.as_millis()).unwrap_or(0);
    let offset = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(-jitter_ms..=jitter_ms)
    };
    let ttl_ms = u64::try_from(base_ms.saturating_add(offset)).unwrap_or(0);
    Duration::from_millis(ttl_ms).max(MIN_TTL)
}

/// Base TTL and jitter of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    /// Base TTL in seconds.
    pub base_secs: u64,
    /// Maximum jitter in seconds, applied in both directions.
    pub jitter_secs: u64,
}

impl TtlPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(base_secs: u64, jitter_secs: u64) -> Self {
        Self {
            base_secs,
            jitter_secs,
        }
    }

    /// Draws a TTL from this policy.
    #[must_use]
    pub fn sample(&self) -> Duration {
        jittered_ttl(
            Duration::from_secs(self.base_secs),
            Duration::from_secs(self.jitter_secs),
        )
    }

    /// Longest TTL this policy can produce.
    #[must_use]
    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.base_secs.saturating_add(self.jitter_secs))
    }
}

/// TTLs of every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    /// Successful exact quote responses.
    pub exact: TtlPolicy,
    /// Exact quote responses where every provider failed.
    pub failure: TtlPolicy,
    /// Corridor rate snapshots.
    pub rate: TtlPolicy,
    /// Corridor availability.
    pub availability: TtlPolicy,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            exact: TtlPolicy::new(300, 30),
            failure: TtlPolicy::new(60, 10),
            rate: TtlPolicy::new(4 * 3600, 600),
            availability: TtlPolicy::new(12 * 3600, 1800),
        }
    }
}

/// Cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Exact quote tier.
    Exact,
    /// Corridor availability tier.
    Availability,
    /// Corridor rate tier.
    Rate,
}

impl CacheTier {
    /// Short name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Availability => "availability",
            Self::Rate => "rate",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct TierCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit and miss counters per tier.
#[derive(Debug, Default)]
pub struct CacheStats {
    exact: TierCounters,
    availability: TierCounters,
    rate: TierCounters,
    errors: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    fn tier(&self, tier: CacheTier) -> &TierCounters {
        match tier {
            CacheTier::Exact => &self.exact,
            CacheTier::Availability => &self.availability,
            CacheTier::Rate => &self.rate,
        }
    }

    fn record_hit(&self, tier: CacheTier) {
        self.tier(tier).hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, tier: CacheTier) {
        self.tier(tier).misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            exact_hits: load(&self.exact.hits),
            exact_misses: load(&self.exact.misses),
            availability_hits: load(&self.availability.hits),
            availability_misses: load(&self.availability.misses),
            rate_hits: load(&self.rate.hits),
            rate_misses: load(&self.rate.misses),
            errors: load(&self.errors),
            writes: load(&self.writes),
            invalidated_keys: load(&self.invalidations),
        }
    }
}

/// Serializable copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Exact tier hits.
    pub exact_hits: u64,
    /// Exact tier misses.
    pub exact_misses: u64,
    /// Availability tier hits.
    pub availability_hits: u64,
    /// Availability tier misses.
    pub availability_misses: u64,
    /// Rate tier hits.
    pub rate_hits: u64,
    /// Rate tier misses.
    pub rate_misses: u64,
    /// Store errors absorbed as misses or skipped writes.
    pub errors: u64,
    /// Successful writes.
    pub writes: u64,
    /// Keys removed by invalidation.
    pub invalidated_keys: u64,
}

/// Typed access to the three cache tiers over one [`CacheStore`].
#[derive(Debug, Clone)]
pub struct TieredCacheManager {
    store: Arc<dyn CacheStore>,
    ttl: CacheTtlConfig,
    stats: Arc<CacheStats>,
}

impl TieredCacheManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtlConfig) -> Self {
        Self {
            store,
            ttl,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the TTL configuration.
    #[must_use]
    pub fn ttl_config(&self) -> &CacheTtlConfig {
        &self.ttl
    }

    /// Returns the counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // Exact quote tier

    /// Reads the cached response for `(corridor, amount)`.
    pub async fn get_exact(&self, corridor: &Corridor, amount: SendAmount) -> Option<AggregateResponse> {
        self.read(&exact_key(corridor, amount), CacheTier::Exact).await
    }

    /// Caches a response under its corridor and amount.
    ///
    /// Responses without any successful provider get the short failure TTL.
    pub async fn put_exact(&self, response: &AggregateResponse) {
        let policy = if response.successful_count() > 0 {
            self.ttl.exact
        } else {
            self.ttl.failure
        };
        let key = exact_key(&response.corridor, response.amount);
        self.write(&key, response, policy.sample(), CacheTier::Exact).await;
    }

    // Availability tier

    /// Reads corridor availability; a miss is `Unknown`.
    pub async fn get_availability(&self, corridor: &Corridor) -> CorridorAvailability {
        self.read(&availability_key(corridor), CacheTier::Availability)
            .await
            .unwrap_or_default()
    }

    /// Records corridor availability. `Unknown` is never stored.
    pub async fn put_availability(&self, corridor: &Corridor, availability: CorridorAvailability) {
        if availability == CorridorAvailability::Unknown {
            return;
        }
        let ttl = self.ttl.availability.sample();
        self.write(&availability_key(corridor), &availability, ttl, CacheTier::Availability)
            .await;
    }

    // Corridor rate tier

    /// Reads the rate snapshot of `corridor`.
    pub async fn get_rate_snapshot(&self, corridor: &Corridor) -> Option<CorridorRateSnapshot> {
        self.read(&rate_key(corridor), CacheTier::Rate).await
    }

    /// Replaces the rate snapshot of its corridor.
    pub async fn put_rate_snapshot(&self, snapshot: &CorridorRateSnapshot) {
        let ttl = self.ttl.rate.sample();
        self.write(&rate_key(snapshot.corridor()), snapshot, ttl, CacheTier::Rate)
            .await;
    }

    // Invalidation

    /// Removes every tier's entries for `corridor`. Returns the number of keys
    /// removed; failures are logged.
    pub async fn invalidate_corridor_caches(&self, corridor: &Corridor) -> u64 {
        let exact_pattern = format!(
            "{EXACT_PREFIX}:{}:{}:{}:{}:*",
            corridor.source_country().as_str(),
            corridor.dest_country().as_str(),
            corridor.source_currency().as_str(),
            corridor.dest_currency().as_str()
        );

        let mut removed = self.delete_pattern(&exact_pattern).await;
        removed += self.delete_key(&rate_key(corridor)).await;
        removed += self.delete_key(&availability_key(corridor)).await;

        tracing::debug!(corridor = %corridor, removed, "corridor caches invalidated");
        removed
    }

    /// Removes every tier's entries for the country pair; `None` on either side
    /// matches any country.
    pub async fn invalidate_by_corridor(
        &self,
        source_country: Option<&CountryCode>,
        dest_country: Option<&CountryCode>,
    ) -> u64 {
        let source = source_country.map_or("*", CountryCode::as_str);
        let dest = dest_country.map_or("*", CountryCode::as_str);

        let mut removed = 0;
        for pattern in [
            format!("{EXACT_PREFIX}:{source}:{dest}:*"),
            format!("{RATE_PREFIX}:{source}:{dest}:*"),
            format!("{AVAILABILITY_PREFIX}:{source}:{dest}"),
        ] {
            removed += self.delete_pattern(&pattern).await;
        }

        tracing::info!(source, dest, removed, "cache invalidated by corridor");
        removed
    }

    /// Removes every entry of every tier.
    pub async fn invalidate_all(&self) -> u64 {
        let mut removed = 0;
        for pattern in [
            format!("{EXACT_PREFIX}:*"),
            format!("{RATE_PREFIX}:*"),
            format!("{AVAILABILITY_PREFIX}:*"),
        ] {
            removed += self.delete_pattern(&pattern).await;
        }

        tracing::info!(removed, "all quote caches invalidated");
        removed
    }

    /// Removes exact and rate entries that mention `provider_id`.
    ///
    /// Entries that no longer decode are removed as well.
    pub async fn invalidate_provider(&self, provider_id: &str) -> u64 {
        let mut removed = 0;

        for key in self.scan(&format!("{EXACT_PREFIX}:*")).await {
            let stale = self
                .peek::<AggregateResponse>(&key)
                .await
                .is_none_or(|r| r.mentions_provider(provider_id));
            if stale {
                removed += self.delete_key(&key).await;
            }
        }

        for key in self.scan(&format!("{RATE_PREFIX}:*")).await {
            let stale = self
                .peek::<CorridorRateSnapshot>(&key)
                .await
                .is_none_or(|s| s.mentions_provider(provider_id));
            if stale {
                removed += self.delete_key(&key).await;
            }
        }

        tracing::info!(provider_id, removed, "provider cache entries invalidated");
        removed
    }

    // Fail-open store access

    async fn read<T: DeserializeOwned>(&self, key: &str, tier: CacheTier) -> Option<T> {
        match self.decode(key).await {
            Some(value) => {
                self.stats.record_hit(tier);
                tracing::debug!(key, tier = tier.as_str(), "cache hit");
                Some(value)
            }
            None => {
                self.stats.record_miss(tier);
                tracing::debug!(key, tier = tier.as_str(), "cache miss");
                None
            }
        }
    }

    /// Reads without touching the hit counters.
    async fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.decode(key).await
    }

    async fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "dropping undecodable cache entry");
                self.delete_key(key).await;
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration, tier: CacheTier) {
        let result: CacheResult<()> = async {
            let payload = serde_json::to_string(value)?;
            self.store.set(key, payload, ttl).await
        }
        .await;

        match result {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, tier = tier.as_str(), ttl_secs = ttl.as_secs(), "cache write");
            }
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(key, tier = tier.as_str(), error = %err, "cache write failed");
            }
        }
    }

    async fn delete_key(&self, key: &str) -> u64 {
        match self.store.delete(key).await {
            Ok(removed) => {
                let removed = u64::from(removed);
                self.stats.invalidations.fetch_add(removed, Ordering::Relaxed);
                removed
            }
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(key, error = %err, "cache delete failed");
                0
            }
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        match self.store.delete_by_pattern(pattern).await {
            Ok(removed) => {
                self.stats.invalidations.fetch_add(removed, Ordering::Relaxed);
                removed
            }
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(pattern, error = %err, "cache purge failed");
                0
            }
        }
    }

    async fn scan(&self, pattern: &str) -> Vec<String> {
        match self.store.scan_keys(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(pattern, error = %err, "cache scan failed");
                Vec::new()
            }
        }
    }
}
