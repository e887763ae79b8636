//! End-to-end quote flow through the service and the HTTP router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use remit_quotes::api::rest::{AppState, QuotesResponse, create_router};
use remit_quotes::application::services::{
    AggregationConfig, CacheTtlConfig, FetchOptions, QuoteAggregationEngine, QuoteService,
    TieredCacheManager,
};
use remit_quotes::domain::entities::{Quote, QuoteBuilder};
use remit_quotes::domain::value_objects::{
    CorridorAvailability, Corridor, QuoteRequest, SendAmount,
};
use remit_quotes::infrastructure::cache::InMemoryCacheStore;
use remit_quotes::infrastructure::providers::{
    ProviderError, ProviderResult, QuoteProvider, StaticProviderRegistry,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

#[derive(Debug)]
struct CountingProvider {
    id: &'static str,
    rate: Option<(f64, f64)>,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn priced(id: &'static str, rate: f64, fee: f64) -> Arc<Self> {
        Arc::new(Self {
            id,
            rate: Some((rate, fee)),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            rate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for CountingProvider {
    fn provider_id(&self) -> &str {
        self.id
    }

    async fn get_quote(&self, request: &QuoteRequest) -> ProviderResult<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (rate, fee) = self
            .rate
            .ok_or_else(|| ProviderError::connection("upstream unavailable"))?;
        let corridor = request.corridor();
        let amount = request.amount().get();
        Ok(QuoteBuilder::new(
            self.id,
            amount,
            corridor.source_currency().clone(),
            corridor.dest_currency().clone(),
        )
        .exchange_rate(rate)
        .fee(fee)
        .destination_amount((amount - fee) * rate)
        .build())
    }
}

struct Harness {
    service: QuoteService,
    store: InMemoryCacheStore,
    a: Arc<CountingProvider>,
    b: Arc<CountingProvider>,
}

impl Harness {
    fn new() -> Self {
        let a = CountingProvider::priced("provider_a", 18.5, 5.0);
        let b = CountingProvider::failing("provider_b");
        let providers: Vec<Arc<dyn QuoteProvider>> = vec![a.clone(), b.clone()];
        let store = InMemoryCacheStore::new();
        let cache = TieredCacheManager::new(Arc::new(store.clone()), CacheTtlConfig::default());
        let engine = Arc::new(QuoteAggregationEngine::new(
            Arc::new(StaticProviderRegistry::with_providers(providers)),
            AggregationConfig::default(),
        ));
        Self {
            service: QuoteService::new(engine, cache),
            store,
            a,
            b,
        }
    }

    fn total_calls(&self) -> usize {
        self.a.calls() + self.b.calls()
    }
}

fn corridor() -> Corridor {
    Corridor::parse("US", "MX", "USD", "MXN").unwrap()
}

fn request(amount: f64) -> QuoteRequest {
    QuoteRequest::new(corridor(), SendAmount::new(amount).unwrap())
}

#[tokio::test]
async fn cold_request_fans_out_and_marks_corridor_available() {
    let h = Harness::new();

    let response = h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

    assert!(response.success);
    assert!(!response.cache_hit);
    assert_eq!(response.all_results.len(), 2);
    assert_eq!(response.results[0].provider_id(), "provider_a");
    let dest = response.results[0].destination_amount().unwrap();
    assert!((dest - 18_407.5).abs() < 1e-6);
    assert_eq!(h.a.calls(), 1);
    assert_eq!(h.b.calls(), 1);
    assert_eq!(
        h.service.cache().get_availability(&corridor()).await,
        CorridorAvailability::Available
    );
}

#[tokio::test]
async fn new_amount_is_recomputed_from_rate_cache() {
    let h = Harness::new();
    h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    let calls = h.total_calls();

    let response = h.service.get_quotes(&request(500.0), &FetchOptions::default()).await;

    assert_eq!(h.total_calls(), calls);
    assert!(response.rate_calculation);
    assert!(response.success);
    let dest = response.results[0].destination_amount().unwrap();
    assert!((dest - 9_157.5).abs() < 1e-6);
}

#[tokio::test]
async fn repeated_request_is_an_exact_hit() {
    let h = Harness::new();
    h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    let calls = h.total_calls();

    let response = h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;

    assert!(response.cache_hit);
    assert!(!response.rate_calculation);
    assert_eq!(h.total_calls(), calls);
}

#[tokio::test]
async fn invalidation_forces_new_fan_out() {
    let h = Harness::new();
    h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    let calls = h.total_calls();

    let removed = h.service.cache().invalidate_corridor_caches(&corridor()).await;
    assert_eq!(removed, 3);

    let response = h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    assert!(!response.cache_hit);
    assert_eq!(h.total_calls(), calls + 2);
}

#[tokio::test]
async fn unavailable_corridor_short_circuits() {
    let b = CountingProvider::failing("provider_b");
    let providers: Vec<Arc<dyn QuoteProvider>> = vec![b.clone()];
    let cache = TieredCacheManager::new(Arc::new(InMemoryCacheStore::new()), CacheTtlConfig::default());
    let engine = Arc::new(QuoteAggregationEngine::new(
        Arc::new(StaticProviderRegistry::with_providers(providers)),
        AggregationConfig::default(),
    ));
    let service = QuoteService::new(engine, cache);

    let first = service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    assert!(!first.success);
    assert_eq!(b.calls(), 1);

    let second = service.get_quotes(&request(250.0), &FetchOptions::default()).await;
    assert!(!second.success);
    assert!(second.cache_hit);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn negative_amount_is_rejected_before_any_work() {
    let h = Harness::new();
    let router = create_router(Arc::new(AppState::new(h.service.clone())));

    let http_request = Request::builder()
        .uri("/quotes?source_country=US&dest_country=MX&source_currency=USD&dest_currency=MXN&amount=-5")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(http_request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.total_calls(), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn http_and_service_agree() {
    let h = Harness::new();
    let router = create_router(Arc::new(AppState::new(h.service.clone())));

    let http_request = Request::builder()
        .uri("/quotes?source_country=USA&dest_country=MEX&source_currency=usd&dest_currency=mxn&amount=1,000")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(http_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let quotes: QuotesResponse = serde_json::from_slice(&body).unwrap();

    assert!(quotes.success);
    assert_eq!(quotes.quotes.len(), 1);
    assert_eq!(quotes.quotes[0].provider_id(), "provider_a");

    let cached = h.service.get_quotes(&request(1000.0), &FetchOptions::default()).await;
    assert!(cached.cache_hit);
}
