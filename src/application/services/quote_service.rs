//! # Quote Service
//!
//! Cache-first orchestration of quote requests.
//!
//! # Lookup Precedence
//!
//! ```text
//! exact quote hit ──────────────► re-rank cached results        (cache_hit)
//!       │ miss
//! corridor UNAVAILABLE ─────────► failure response, no calls    (cache_hit)
//!       │ otherwise
//! corridor rate hit ────────────► recompute for amount, write   (cache_hit, rate_calculation)
//!       │ miss                    through to exact tier
//! provider fan-out ─────────────► write availability, rate and exact tiers,
//!                                 persist in the background
//! ```
//!
//! `use_cache = false` skips the lookup and always fans out; results are still
//! written through.

use crate::application::error::AggregationError;
use crate::application::jobs::request_log::RequestLog;
use crate::application::services::normalizer::{filter_duplicate_providers, normalize_quote};
use crate::application::services::persistence_sink::{PersistenceSink, WriteOrigin};
use crate::application::services::quote_aggregation::{FetchOptions, QuoteAggregationEngine};
use crate::application::services::ranking_strategy::rank_results;
use crate::application::services::tiered_cache::TieredCacheManager;
use crate::domain::entities::aggregate_response::AggregateResponse;
use crate::domain::entities::quote::Quote;
use crate::domain::entities::rate_snapshot::CorridorRateSnapshot;
use crate::domain::value_objects::enums::CorridorAvailability;
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::domain::value_objects::timestamp::Timestamp;
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates cache lookups, provider fan-out, cache writes and persistence.
#[derive(Debug, Clone)]
pub struct QuoteService {
    engine: Arc<QuoteAggregationEngine>,
    cache: TieredCacheManager,
    sink: Option<PersistenceSink>,
    request_log: Option<Arc<RequestLog>>,
}

impl QuoteService {
    /// Creates a service without persistence or request logging.
    #[must_use]
    pub fn new(engine: Arc<QuoteAggregationEngine>, cache: TieredCacheManager) -> Self {
        Self {
            engine,
            cache,
            sink: None,
            request_log: None,
        }
    }

    /// Persists successful fan-out results through `sink`.
    #[must_use]
    pub fn with_persistence(mut self, sink: PersistenceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Records every request in `log`.
    #[must_use]
    pub fn with_request_log(mut self, log: Arc<RequestLog>) -> Self {
        self.request_log = Some(log);
        self
    }

    /// Returns the cache manager.
    #[must_use]
    pub fn cache(&self) -> &TieredCacheManager {
        &self.cache
    }

    /// Returns the aggregation engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<QuoteAggregationEngine> {
        &self.engine
    }

    /// Returns the persistence sink, if configured.
    #[must_use]
    pub fn sink(&self) -> Option<&PersistenceSink> {
        self.sink.as_ref()
    }

    /// Answers a quote request.
    ///
    /// Never fails: provider, cache and persistence failures all degrade into
    /// a response with `success = false` or a fresh fan-out.
    #[tracing::instrument(skip(self, options), fields(corridor = %request.corridor(), amount = %request.amount(), use_cache = options.use_cache))]
    pub async fn get_quotes(&self, request: &QuoteRequest, options: &FetchOptions) -> AggregateResponse {
        if let Some(log) = &self.request_log {
            log.record(request.corridor(), request.amount());
        }

        let started = Instant::now();
        if options.use_cache {
            if let Some(response) = self.lookup(request, options, started).await {
                return response;
            }
        }

        self.fetch_and_store(request, options).await
    }

    /// Fans out for `request` regardless of cached state and rewrites every
    /// tier.
    pub async fn refresh_corridor(&self, request: &QuoteRequest) -> AggregateResponse {
        self.fetch_and_store(request, &FetchOptions::default().force_refresh())
            .await
    }

    async fn lookup(
        &self,
        request: &QuoteRequest,
        options: &FetchOptions,
        started: Instant,
    ) -> Option<AggregateResponse> {
        let corridor = request.corridor();
        let amount = request.amount();

        if let Some(cached) = self.cache.get_exact(corridor, amount).await {
            tracing::debug!("served from exact quote cache");
            return Some(rerank(cached, options, started));
        }

        if self.cache.get_availability(corridor).await.is_unavailable() {
            tracing::debug!("corridor marked unavailable, skipping providers");
            let mut response = AggregateResponse::failed(
                corridor.clone(),
                amount,
                options.sort_by,
                options.filters.clone(),
                format!("no provider currently serves {corridor}"),
            );
            response.cache_hit = true;
            response.elapsed_seconds = started.elapsed().as_secs_f64();
            return Some(response);
        }

        let snapshot = self.cache.get_rate_snapshot(corridor).await?;
        let all_results = snapshot.quotes_for_amount(amount.get());
        let results = rank_results(&all_results, options.sort_by, &options.filters);
        let response = AggregateResponse {
            corridor: corridor.clone(),
            amount,
            success: !results.is_empty(),
            error_message: results
                .is_empty()
                .then(|| "no cached provider rate covers this request".to_string()),
            results,
            all_results,
            cache_hit: true,
            rate_calculation: true,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            filters_applied: options.filters.clone(),
            sort_by: options.sort_by,
            timestamp: Timestamp::now(),
        };

        tracing::debug!(providers = snapshot.providers().len(), "recomputed from corridor rate cache");
        self.cache.put_exact(&response).await;
        Some(response)
    }

    async fn fetch_and_store(&self, request: &QuoteRequest, options: &FetchOptions) -> AggregateResponse {
        let corridor = request.corridor();

        let response = match self.engine.get_all_quotes(request, options).await {
            Ok(response) => response,
            Err(err @ AggregationError::NoProvidersRegistered) => {
                tracing::warn!(error = %err, "quote request with no providers");
                return AggregateResponse::failed(
                    corridor.clone(),
                    request.amount(),
                    options.sort_by,
                    options.filters.clone(),
                    err.to_string(),
                );
            }
        };

        let successful: Vec<Quote> = filter_duplicate_providers(
            response
                .all_results
                .iter()
                .filter(|q| q.is_success())
                .map(normalize_quote)
                .collect(),
        );

        self.cache
            .put_availability(corridor, CorridorAvailability::from_success(!successful.is_empty()))
            .await;
        if let Some(snapshot) = CorridorRateSnapshot::from_quotes(corridor.clone(), &successful) {
            self.cache.put_rate_snapshot(&snapshot).await;
        }
        self.cache.put_exact(&response).await;

        if let Some(sink) = &self.sink {
            if !successful.is_empty() {
                sink.spawn_persist(corridor.clone(), successful, WriteOrigin::Aggregation);
            }
        }

        tracing::info!(
            successful = response.successful_count(),
            providers = response.all_results.len(),
            elapsed_ms = (response.elapsed_seconds * 1000.0) as u64,
            "quotes fetched from providers"
        );
        response
    }
}

/// Re-applies the requested ranking and filters to a cached response.
fn rerank(mut cached: AggregateResponse, options: &FetchOptions, started: Instant) -> AggregateResponse {
    cached.results = rank_results(&cached.all_results, options.sort_by, &options.filters);
    cached.success = !cached.results.is_empty();
    if cached.success {
        cached.error_message = None;
    } else if cached.error_message.is_none() {
        cached.error_message = Some("no cached quote matches the requested filters".to_string());
    }
    cached.sort_by = options.sort_by;
    cached.filters_applied = options.filters.clone();
    cached.cache_hit = true;
    cached.elapsed_seconds = started.elapsed().as_secs_f64();
    cached
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::application::services::quote_aggregation::AggregationConfig;
    use crate::application::services::tiered_cache::{CacheTtlConfig, exact_key};
    use crate::domain::entities::aggregate_response::QuoteFilters;
    use crate::domain::value_objects::amount::SendAmount;
    use crate::domain::value_objects::corridor::Corridor;
    use crate::domain::value_objects::enums::SortBy;
    use crate::infrastructure::cache::{CacheStore, InMemoryCacheStore};
    use crate::infrastructure::persistence::{InMemoryQuoteRepository, QuoteRepository};
    use crate::infrastructure::providers::{
        FixedRateEntry, FixedRateProvider, QuoteProvider, StaticProviderRegistry,
    };
    use std::time::Duration;

    fn corridor() -> Corridor {
        Corridor::parse("US", "MX", "USD", "MXN").unwrap()
    }

    fn request(amount: f64) -> QuoteRequest {
        QuoteRequest::new(corridor(), SendAmount::new(amount).unwrap())
    }

    fn provider(id: &str, rate: f64, fee: f64, minutes: u32) -> Arc<dyn QuoteProvider> {
        Arc::new(FixedRateProvider::new(id).with_entry(
            FixedRateEntry::new("USD", "MXN", rate)
                .with_flat_fee(fee)
                .with_delivery_time(minutes),
        ))
    }

    fn service(providers: Vec<Arc<dyn QuoteProvider>>) -> (QuoteService, InMemoryCacheStore) {
        let store = InMemoryCacheStore::new();
        let cache = TieredCacheManager::new(Arc::new(store.clone()), CacheTtlConfig::default());
        let registry = Arc::new(StaticProviderRegistry::with_providers(providers));
        let engine = Arc::new(QuoteAggregationEngine::new(registry, AggregationConfig::default()));
        (QuoteService::new(engine, cache), store)
    }

    #[tokio::test]
    async fn full_miss_writes_every_tier() {
        let (service, store) = service(vec![
            provider("wise", 18.5, 3.0, 60),
            provider("remitly", 18.2, 0.0, 30),
        ]);

        let response = service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        assert!(response.success);
        assert!(!response.cache_hit);
        assert_eq!(response.results[0].provider_id(), "wise");
        assert_eq!(store.len(), 3);
        assert!(service.cache().get_rate_snapshot(&corridor()).await.is_some());
        assert_eq!(
            service.cache().get_availability(&corridor()).await,
            CorridorAvailability::Available
        );
    }

    #[tokio::test]
    async fn exact_hit_honours_requested_sort() {
        let (service, _) = service(vec![
            provider("wise", 18.5, 3.0, 60),
            provider("remitly", 18.2, 0.0, 30),
        ]);
        service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        let response = service
            .get_quotes(&request(1000.0), &FetchOptions::sorted_by(SortBy::FastestTime))
            .await;

        assert!(response.cache_hit);
        assert!(!response.rate_calculation);
        assert_eq!(response.sort_by, SortBy::FastestTime);
        assert_eq!(response.results[0].provider_id(), "remitly");
    }

    #[tokio::test]
    async fn rate_cache_recomputes_new_amount() {
        let (service, store) = service(vec![provider("wise", 18.5, 3.0, 60)]);
        service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        let response = service.get_quotes(&request(250.0), &FetchOptions::default()).await;

        assert!(response.cache_hit);
        assert!(response.rate_calculation);
        let dest = response.results[0].destination_amount().unwrap();
        assert!((dest - (250.0 - 3.0) * 18.5).abs() < 1e-6);

        let key = exact_key(&corridor(), SendAmount::new(250.0).unwrap());
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unavailable_corridor_short_circuits() {
        let (service, _) = service(vec![Arc::new(FixedRateProvider::new("wise"))]);

        let first = service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
        assert!(!first.success);
        assert!(!first.cache_hit);
        assert!(service.cache().get_availability(&corridor()).await.is_unavailable());

        let second = service.get_quotes(&request(400.0), &FetchOptions::default()).await;
        assert!(second.cache_hit);
        assert!(!second.success);
        assert!(second.all_results.is_empty());
    }

    #[tokio::test]
    async fn no_providers_caches_nothing() {
        let (service, store) = service(vec![]);

        let response = service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        assert!(!response.success);
        assert!(response.error_message.unwrap().contains("no quote providers"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn force_refresh_bypasses_lookup() {
        let (service, _) = service(vec![provider("wise", 18.5, 3.0, 60)]);
        service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        let response = service
            .get_quotes(&request(1000.0), &FetchOptions::default().force_refresh())
            .await;

        assert!(!response.cache_hit);
        assert!(response.success);
    }

    #[tokio::test]
    async fn filters_on_cached_response() {
        let (service, _) = service(vec![
            provider("wise", 18.5, 3.0, 60),
            provider("remitly", 18.2, 0.0, 30),
        ]);
        service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        let options = FetchOptions::default().with_filters(QuoteFilters {
            max_fee: Some(1.0),
            ..QuoteFilters::default()
        });
        let response = service.get_quotes(&request(1000.0), &options).await;

        assert!(response.cache_hit);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.all_results.len(), 2);
        assert_eq!(response.filters_applied.max_fee, Some(1.0));
    }

    #[tokio::test]
    async fn successful_fetch_is_persisted_in_background() {
        let (service, _) = service(vec![provider("wise", 18.5, 3.0, 60)]);
        let repo = InMemoryQuoteRepository::new();
        let sink = PersistenceSink::new(Arc::new(repo.clone()), service.cache().clone());
        let log = Arc::new(RequestLog::new());
        let service = service.with_persistence(sink).with_request_log(Arc::clone(&log));

        service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

        for _ in 0..50 {
            if repo.count().await.unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(log.top_queries(1)[0].count, 1);
    }
}
