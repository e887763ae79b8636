//! # In-Memory Quote Repository
//!
//! In-memory implementation of [`QuoteRepository`] for tests and for
//! deployments without a database.

use crate::domain::value_objects::timestamp::Timestamp;
use crate::infrastructure::persistence::traits::{
    QuoteRecord, QuoteRecordFilter, QuoteRecordKey, QuoteRepository, RepositoryResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of [`QuoteRepository`].
///
/// Uses a thread-safe `HashMap` keyed by the natural key.
#[derive(Debug, Clone)]
pub struct InMemoryQuoteRepository {
    storage: Arc<RwLock<HashMap<QuoteRecordKey, QuoteRecord>>>,
}

impl InMemoryQuoteRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage
            .try_read()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }

    /// Returns true if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every record.
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

impl Default for InMemoryQuoteRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn upsert(&self, record: &QuoteRecord) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &QuoteRecordKey) -> RepositoryResult<Option<QuoteRecord>> {
        let storage = self.storage.read().await;
        Ok(storage.get(key).cloned())
    }

    async fn query(&self, filter: &QuoteRecordFilter) -> RepositoryResult<Vec<QuoteRecord>> {
        let storage = self.storage.read().await;
        let mut records: Vec<QuoteRecord> = storage
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn purge_older_than(&self, cutoff: Timestamp) -> RepositoryResult<u64> {
        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|_, r| !r.last_updated.is_before(&cutoff));
        Ok((before - storage.len()) as u64)
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let storage = self.storage.read().await;
        Ok(storage.len() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::entities::quote::QuoteBuilder;
    use crate::domain::value_objects::corridor::Corridor;

    fn corridor() -> Corridor {
        Corridor::parse("US", "MX", "USD", "MXN").unwrap()
    }

    fn record(provider: &str, amount: f64, rate: f64, at: Timestamp) -> QuoteRecord {
        let quote = QuoteBuilder::new(
            provider,
            amount,
            corridor().source_currency().clone(),
            corridor().dest_currency().clone(),
        )
        .exchange_rate(rate)
        .fee(2.0)
        .destination_amount((amount - 2.0) * rate)
        .build();
        QuoteRecord::from_quote(&corridor(), &quote, at).unwrap()
    }

    #[tokio::test]
    async fn new_repository_is_empty() {
        let repo = InMemoryQuoteRepository::new();
        assert!(repo.is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let repo = InMemoryQuoteRepository::new();
        let now = Timestamp::now();
        repo.upsert(&record("wise", 100.0, 18.0, now)).await.unwrap();
        repo.upsert(&record("wise", 100.0, 18.3, now)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let key = record("wise", 100.0, 0.0, now).key;
        let stored = repo.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.exchange_rate, 18.3);
    }

    #[tokio::test]
    async fn different_amounts_are_different_records() {
        let repo = InMemoryQuoteRepository::new();
        let now = Timestamp::now();
        repo.upsert(&record("wise", 100.0, 18.0, now)).await.unwrap();
        repo.upsert(&record("wise", 500.0, 18.0, now)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn query_orders_newest_first_and_limits() {
        let repo = InMemoryQuoteRepository::new();
        let now = Timestamp::now();
        repo.upsert(&record("a", 100.0, 18.0, now.sub_secs(30))).await.unwrap();
        repo.upsert(&record("b", 100.0, 18.0, now)).await.unwrap();
        repo.upsert(&record("c", 100.0, 18.0, now.sub_secs(60))).await.unwrap();

        let records = repo
            .query(&QuoteRecordFilter::for_corridor(corridor()).limit(2))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.provider_id, "b");
        assert_eq!(records[1].key.provider_id, "a");
    }

    #[tokio::test]
    async fn purge_older_than_cutoff() {
        let repo = InMemoryQuoteRepository::new();
        let now = Timestamp::now();
        repo.upsert(&record("old", 100.0, 18.0, now.sub_secs(3600))).await.unwrap();
        repo.upsert(&record("new", 100.0, 18.0, now)).await.unwrap();

        let purged = repo.purge_older_than(now.sub_secs(60)).await.unwrap();

        assert_eq!(purged, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear() {
        let repo = InMemoryQuoteRepository::new();
        repo.upsert(&record("a", 100.0, 18.0, Timestamp::now())).await.unwrap();
        repo.clear().await;
        assert!(repo.is_empty());
    }
}
