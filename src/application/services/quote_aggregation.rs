//! # Quote Aggregation Engine
//!
//! Concurrent fan-out of one quote request to every registered provider.
//!
//! This module provides the [`QuoteAggregationEngine`], which calls every
//! provider in parallel, turns every timeout, error and panic into a failed
//! quote for that provider alone, and ranks the successful results.
//!
//! # Concurrency
//!
//! - One task per provider in a [`JoinSet`]; dropping the aggregation future
//!   drops the set, which aborts every in-flight provider call.
//! - A shared semaphore caps in-flight provider calls across requests.
//! - Each call runs until `min(now + provider timeout, request deadline)`.

use crate::application::error::AggregationError;
use crate::application::services::ranking_strategy::rank_results;
use crate::domain::entities::aggregate_response::{AggregateResponse, QuoteFilters};
use crate::domain::entities::quote::Quote;
use crate::domain::value_objects::enums::SortBy;
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::domain::value_objects::timestamp::Timestamp;
use crate::infrastructure::providers::registry::ProviderRegistry;
use crate::infrastructure::providers::traits::{DEFAULT_PROVIDER_TIMEOUT, QuoteProvider};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

/// Configuration for quote aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Timeout of providers that do not declare one, in milliseconds.
    pub default_provider_timeout_ms: u64,
    /// Lower bound applied to provider timeouts, in milliseconds.
    pub min_provider_timeout_ms: u64,
    /// Upper bound applied to provider timeouts, in milliseconds.
    pub max_provider_timeout_ms: u64,
    /// Deadline of the whole fan-out, in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum number of provider calls in flight.
    pub max_concurrency: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64,
            min_provider_timeout_ms: 10_000,
            max_provider_timeout_ms: 30_000,
            request_timeout_ms: 35_000,
            max_concurrency: 16,
        }
    }
}

impl AggregationConfig {
    /// Sets the request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Sets the bounds provider timeouts are clamped into.
    #[must_use]
    pub fn with_provider_timeout_bounds(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_provider_timeout_ms = min_ms;
        self.max_provider_timeout_ms = max_ms;
        self
    }

    /// Sets the concurrency ceiling.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Clamps a provider's declared timeout into the configured bounds.
    #[must_use]
    pub fn clamp_provider_timeout(&self, declared: Duration) -> Duration {
        let min = Duration::from_millis(self.min_provider_timeout_ms);
        let max = Duration::from_millis(self.max_provider_timeout_ms.max(self.min_provider_timeout_ms));
        declared.clamp(min, max)
    }

    /// Returns the request deadline as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Per-request options of a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Ranking criterion.
    pub sort_by: SortBy,
    /// Filters applied before ranking.
    pub filters: QuoteFilters,
    /// Whether cached answers may be used. False forces a fan-out.
    pub use_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            sort_by: SortBy::default(),
            filters: QuoteFilters::default(),
            use_cache: true,
        }
    }
}

impl FetchOptions {
    /// Creates options with the given sort order.
    #[must_use]
    pub fn sorted_by(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            ..Self::default()
        }
    }

    /// Sets the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: QuoteFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Bypasses cache reads.
    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Engine collecting and ranking quotes from every registered provider.
#[derive(Debug)]
pub struct QuoteAggregationEngine {
    registry: Arc<dyn ProviderRegistry>,
    config: AggregationConfig,
    limiter: Arc<Semaphore>,
}

impl QuoteAggregationEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(registry: Arc<dyn ProviderRegistry>, config: AggregationConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            registry,
            config,
            limiter,
        }
    }

    /// Creates a new engine with default configuration.
    #[must_use]
    pub fn with_defaults(registry: Arc<dyn ProviderRegistry>) -> Self {
        Self::new(registry, AggregationConfig::default())
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ProviderRegistry> {
        &self.registry
    }

    /// Calls every provider and ranks the results.
    ///
    /// `all_results` holds one quote per registered provider, in registration
    /// order. A batch where every provider failed is a normal, unsuccessful
    /// response.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError::NoProvidersRegistered` if the registry is
    /// empty.
    #[tracing::instrument(skip(self, options), fields(corridor = %request.corridor(), amount = %request.amount()))]
    pub async fn get_all_quotes(
        &self,
        request: &QuoteRequest,
        options: &FetchOptions,
    ) -> Result<AggregateResponse, AggregationError> {
        let providers = self.registry.providers().await;
        if providers.is_empty() {
            return Err(AggregationError::NoProvidersRegistered);
        }

        let started = Instant::now();
        let all_results = self.collect_from_providers(request, providers).await;
        let elapsed = started.elapsed();

        let results = rank_results(&all_results, options.sort_by, &options.filters);
        let successful = all_results.iter().filter(|q| q.is_success()).count();

        tracing::debug!(
            providers = all_results.len(),
            successful,
            ranked = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "provider fan-out complete"
        );

        let error_message = if !results.is_empty() {
            None
        } else if successful == 0 {
            Some(format!("all {} providers failed to quote", all_results.len()))
        } else {
            Some("no quote matches the requested filters".to_string())
        };

        Ok(AggregateResponse {
            corridor: request.corridor().clone(),
            amount: request.amount(),
            success: !results.is_empty(),
            results,
            all_results,
            cache_hit: false,
            rate_calculation: false,
            elapsed_seconds: elapsed.as_secs_f64(),
            filters_applied: options.filters.clone(),
            sort_by: options.sort_by,
            error_message,
            timestamp: Timestamp::now(),
        })
    }

    /// Runs one task per provider and returns their quotes in input order.
    async fn collect_from_providers(
        &self,
        request: &QuoteRequest,
        providers: Vec<Arc<dyn QuoteProvider>>,
    ) -> Vec<Quote> {
        let deadline = Instant::now() + self.config.request_timeout();
        let request = Arc::new(request.clone());
        let mut slots: Vec<Option<Quote>> = vec![None; providers.len()];
        let mut task_slots = HashMap::with_capacity(providers.len());
        let mut provider_ids: Vec<String> = Vec::with_capacity(providers.len());
        let mut set = JoinSet::new();

        for (idx, provider) in providers.into_iter().enumerate() {
            provider_ids.push(provider.provider_id().to_string());
            let provider_timeout = self.config.clamp_provider_timeout(provider.timeout());
            let limiter = Arc::clone(&self.limiter);
            let request = Arc::clone(&request);
            let handle = set.spawn(async move {
                fetch_one(provider, &request, limiter, provider_timeout, deadline).await
            });
            task_slots.insert(handle.id(), idx);
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, quote)) => {
                    if let Some(slot) = task_slots.get(&id).and_then(|&i| slots.get_mut(i)) {
                        *slot = Some(quote);
                    }
                }
                Err(err) => {
                    let Some(&idx) = task_slots.get(&err.id()) else {
                        continue;
                    };
                    let provider_id = provider_ids.get(idx).map_or("unknown", String::as_str);
                    tracing::warn!(provider_id, error = %err, "provider task panicked");
                    if let Some(slot) = slots.get_mut(idx) {
                        *slot = Some(failed_quote(
                            provider_id,
                            &request,
                            format!("provider task failed: {err}"),
                        ));
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(provider_ids.iter())
            .map(|(slot, provider_id)| {
                slot.unwrap_or_else(|| failed_quote(provider_id, &request, "provider task did not complete"))
            })
            .collect()
    }
}

/// Calls one provider under the concurrency ceiling and both deadlines.
async fn fetch_one(
    provider: Arc<dyn QuoteProvider>,
    request: &QuoteRequest,
    limiter: Arc<Semaphore>,
    provider_timeout: Duration,
    deadline: Instant,
) -> Quote {
    let provider_id = provider.provider_id();

    let _permit = match timeout_at(deadline, limiter.acquire_owned()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) => return failed_quote(provider_id, request, "concurrency limiter closed"),
        Err(_) => {
            tracing::warn!(provider_id, "request deadline passed while waiting for a provider slot");
            return failed_quote(provider_id, request, "request deadline exceeded");
        }
    };

    let call_deadline = (Instant::now() + provider_timeout).min(deadline);
    let started = Instant::now();
    match timeout_at(call_deadline, provider.get_quote(request)).await {
        Ok(Ok(quote)) => {
            tracing::debug!(
                provider_id,
                success = quote.is_success(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "provider answered"
            );
            quote
        }
        Ok(Err(err)) => {
            tracing::warn!(provider_id, error = %err, "provider call failed");
            failed_quote(provider_id, request, err.to_string())
        }
        Err(_) => {
            let waited_ms = started.elapsed().as_millis() as u64;
            tracing::warn!(provider_id, waited_ms, "provider call timed out");
            failed_quote(provider_id, request, format!("timed out after {waited_ms}ms"))
        }
    }
}

fn failed_quote(provider_id: &str, request: &QuoteRequest, message: impl Into<String>) -> Quote {
    let corridor = request.corridor();
    Quote::failure(
        provider_id,
        request.amount().get(),
        corridor.source_currency().clone(),
        corridor.dest_currency().clone(),
        message,
    )
}
