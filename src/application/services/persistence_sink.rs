//! # Persistence Sink
//!
//! Durable upsert of successful quotes, with the post-write cache
//! invalidation external writers need.
//!
//! Writes never fail a batch: quotes missing a required numeric field are
//! skipped and repository errors are counted and logged.

use crate::application::error::ApplicationResult;
use crate::application::services::tiered_cache::TieredCacheManager;
use crate::domain::entities::quote::Quote;
use crate::domain::value_objects::corridor::Corridor;
use crate::domain::value_objects::timestamp::Timestamp;
use crate::infrastructure::persistence::{QuoteRecord, QuoteRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Who produced a batch of quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOrigin {
    /// The quote flow persisting results it has just cached.
    Aggregation,
    /// Imports and other writers the cache has not seen.
    External,
}

impl WriteOrigin {
    /// Returns true if writes of this origin purge the corridor's caches.
    #[must_use]
    pub const fn invalidates_cache(self) -> bool {
        matches!(self, Self::External)
    }
}

/// Outcome of one [`PersistenceSink::persist_quotes`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Records written.
    pub stored: usize,
    /// Successful quotes skipped for a missing numeric field.
    pub skipped: usize,
    /// Records the repository rejected.
    pub failed: usize,
    /// Cache keys removed after the write.
    pub invalidated: u64,
}

/// Writes successful quotes to a [`QuoteRepository`].
#[derive(Debug, Clone)]
pub struct PersistenceSink {
    repository: Arc<dyn QuoteRepository>,
    cache: TieredCacheManager,
}

impl PersistenceSink {
    /// Creates a sink.
    #[must_use]
    pub fn new(repository: Arc<dyn QuoteRepository>, cache: TieredCacheManager) -> Self {
        Self { repository, cache }
    }

    /// Returns the repository.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn QuoteRepository> {
        &self.repository
    }

    /// Upserts every successful quote of `quotes`. Failed quotes are ignored.
    ///
    /// For [`WriteOrigin::External`] the corridor's caches are purged after
    /// the write when anything was stored.
    pub async fn persist_quotes(
        &self,
        corridor: &Corridor,
        quotes: &[Quote],
        origin: WriteOrigin,
    ) -> PersistReport {
        let now = Timestamp::now();
        let mut report = PersistReport::default();

        for quote in quotes.iter().filter(|q| q.is_success()) {
            let record = match QuoteRecord::from_quote(corridor, quote, now) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(
                        corridor = %corridor,
                        provider_id = quote.provider_id(),
                        error = %err,
                        "skipping quote with incomplete data"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match self.repository.upsert(&record).await {
                Ok(()) => report.stored += 1,
                Err(err) => {
                    tracing::warn!(key = %record.key, error = %err, "quote upsert failed");
                    report.failed += 1;
                }
            }
        }

        if origin.invalidates_cache() && report.stored > 0 {
            report.invalidated = self.cache.invalidate_corridor_caches(corridor).await;
        }

        tracing::debug!(
            corridor = %corridor,
            ?origin,
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed,
            "quotes persisted"
        );
        report
    }

    /// Persists in a background task; the caller does not wait for the write.
    pub fn spawn_persist(
        &self,
        corridor: Corridor,
        quotes: Vec<Quote>,
        origin: WriteOrigin,
    ) -> JoinHandle<PersistReport> {
        let sink = self.clone();
        tokio::spawn(async move { sink.persist_quotes(&corridor, &quotes, origin).await })
    }

    /// Deletes records not updated within `retention`.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Infrastructure` if the repository fails.
    pub async fn purge_older_than(&self, retention: Duration) -> ApplicationResult<u64> {
        let cutoff = Timestamp::now().sub_duration(retention);
        let purged = self.repository.purge_older_than(cutoff).await?;
        tracing::info!(purged, cutoff = %cutoff, "purged stale quote records");
        Ok(purged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::services::tiered_cache::CacheTtlConfig;
    use crate::domain::entities::quote::QuoteBuilder;
    use crate::domain::value_objects::enums::CorridorAvailability;
    use crate::infrastructure::cache::InMemoryCacheStore;
    use crate::infrastructure::persistence::{
        InMemoryQuoteRepository, QuoteRecordFilter, QuoteRecordKey, RepositoryError,
        RepositoryResult,
    };
    use async_trait::async_trait;

    fn corridor() -> Corridor {
        Corridor::parse("US", "MX", "USD", "MXN").unwrap()
    }

    fn quote(provider: &str, rate: f64) -> Quote {
        let c = corridor();
        QuoteBuilder::new(provider, 500.0, c.source_currency().clone(), c.dest_currency().clone())
            .exchange_rate(rate)
            .fee(4.0)
            .destination_amount((500.0 - 4.0) * rate)
            .build()
    }

    fn sink() -> (PersistenceSink, InMemoryQuoteRepository, TieredCacheManager) {
        let repo = InMemoryQuoteRepository::new();
        let cache = TieredCacheManager::new(Arc::new(InMemoryCacheStore::new()), CacheTtlConfig::default());
        (PersistenceSink::new(Arc::new(repo.clone()), cache.clone()), repo, cache)
    }

    #[tokio::test]
    async fn stores_successful_and_skips_incomplete() {
        let (sink, repo, _) = sink();
        let c = corridor();
        let no_fee = QuoteBuilder::new("xoom", 500.0, c.source_currency().clone(), c.dest_currency().clone())
            .exchange_rate(17.9)
            .build();
        let failed = Quote::failure("ria", 500.0, c.source_currency().clone(), c.dest_currency().clone(), "down");

        let report = sink
            .persist_quotes(&c, &[quote("wise", 18.5), no_fee, failed], WriteOrigin::Aggregation)
            .await;

        assert_eq!(report.stored, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let (sink, repo, _) = sink();
        let c = corridor();

        sink.persist_quotes(&c, &[quote("wise", 18.5)], WriteOrigin::Aggregation).await;
        sink.persist_quotes(&c, &[quote("Wise", 18.7)], WriteOrigin::Aggregation).await;

        let records = repo.query(&QuoteRecordFilter::for_corridor(c)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].exchange_rate - 18.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn external_writes_purge_corridor() {
        let (sink, _, cache) = sink();
        let c = corridor();
        cache.put_availability(&c, CorridorAvailability::Unavailable).await;

        sink.persist_quotes(&c, &[quote("wise", 18.5)], WriteOrigin::Aggregation).await;
        assert!(cache.get_availability(&c).await.is_unavailable());

        let report = sink.persist_quotes(&c, &[quote("wise", 18.6)], WriteOrigin::External).await;
        assert_eq!(report.invalidated, 1);
        assert_eq!(cache.get_availability(&c).await, CorridorAvailability::Unknown);
    }

    #[tokio::test]
    async fn spawned_persist_completes() {
        let (sink, repo, _) = sink();
        let report = sink
            .spawn_persist(corridor(), vec![quote("wise", 18.5)], WriteOrigin::Aggregation)
            .await
            .unwrap();
        assert_eq!(report.stored, 1);
        assert_eq!(repo.len(), 1);
    }

    #[derive(Debug)]
    struct DownRepository;

    #[async_trait]
    impl QuoteRepository for DownRepository {
        async fn upsert(&self, _record: &QuoteRecord) -> RepositoryResult<()> {
            Err(RepositoryError::connection("pool timed out"))
        }

        async fn get(&self, _key: &QuoteRecordKey) -> RepositoryResult<Option<QuoteRecord>> {
            Err(RepositoryError::connection("pool timed out"))
        }

        async fn query(&self, _filter: &QuoteRecordFilter) -> RepositoryResult<Vec<QuoteRecord>> {
            Err(RepositoryError::connection("pool timed out"))
        }

        async fn purge_older_than(&self, _cutoff: Timestamp) -> RepositoryResult<u64> {
            Err(RepositoryError::connection("pool timed out"))
        }

        async fn count(&self) -> RepositoryResult<u64> {
            Err(RepositoryError::connection("pool timed out"))
        }
    }

    #[tokio::test]
    async fn repository_failures_are_counted_not_raised() {
        let cache = TieredCacheManager::new(Arc::new(InMemoryCacheStore::new()), CacheTtlConfig::default());
        let sink = PersistenceSink::new(Arc::new(DownRepository), cache);

        let report = sink
            .persist_quotes(&corridor(), &[quote("wise", 18.5), quote("remitly", 18.3)], WriteOrigin::External)
            .await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.invalidated, 0);
        assert!(sink.purge_older_than(Duration::from_secs(3600)).await.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn purge_keeps_recent_records() {
        let (sink, repo, _) = sink();
        sink.persist_quotes(&corridor(), &[quote("wise", 18.5)], WriteOrigin::Aggregation).await;

        let purged = sink.purge_older_than(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(purged, 0);
        assert_eq!(repo.len(), 1);
    }
}
