//! # Bootstrap
//!
//! Builds the service graph from an [`AppConfig`].

use crate::api::rest::{AppState, create_router};
use crate::application::error::InfrastructureError;
use crate::application::jobs::{RefreshJobs, RefreshScheduler, RequestLog};
use crate::application::services::{
    PersistenceSink, QuoteAggregationEngine, QuoteService, TieredCacheManager,
};
use crate::config::{AppConfig, CacheBackend};
use crate::infrastructure::cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
use crate::infrastructure::persistence::{
    InMemoryQuoteRepository, PostgresQuoteRepository, QuoteRepository,
};
use crate::infrastructure::providers::{FixedRateProvider, QuoteProvider, StaticProviderRegistry};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fully wired service.
#[derive(Debug)]
pub struct Application {
    /// Handler state.
    pub state: Arc<AppState>,
    /// Background jobs sharing the same service.
    pub jobs: Arc<RefreshJobs>,
    memory_store: Option<InMemoryCacheStore>,
    cleanup_interval: Duration,
}

impl Application {
    /// HTTP router over [`Application::state`].
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Starts the refresh scheduler if enabled.
    #[must_use]
    pub fn spawn_scheduler(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.jobs.config().enabled {
            tracing::info!("refresh scheduler disabled");
            return None;
        }
        Some(RefreshScheduler::new(Arc::clone(&self.jobs)).spawn(shutdown))
    }

    /// Starts the expired-entry purge of the memory cache; Redis expires keys
    /// itself.
    #[must_use]
    pub fn spawn_cache_cleanup(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let store = self.memory_store.as_ref()?;
        tracing::debug!(every_secs = self.cleanup_interval.as_secs(), "cache cleanup started");
        Some(store.spawn_cleanup(self.cleanup_interval, shutdown))
    }
}

/// Connects stores and wires services.
///
/// # Errors
///
/// Returns `InfrastructureError` if the Redis cache or the database cannot be
/// reached.
#[tracing::instrument(skip(config), fields(cache = ?config.cache.backend, providers = config.providers.len()))]
pub async fn build(config: &AppConfig) -> Result<Application, InfrastructureError> {
    let (store, memory_store) = cache_store(config).await?;
    let cache = TieredCacheManager::new(store, config.cache.ttl);

    let providers: Vec<Arc<dyn QuoteProvider>> = config
        .providers
        .iter()
        .map(|p| Arc::new(FixedRateProvider::from_config(p)) as Arc<dyn QuoteProvider>)
        .collect();
    if providers.is_empty() {
        tracing::warn!("no providers configured; every request will report no quotes");
    }
    let registry = Arc::new(StaticProviderRegistry::with_providers(providers));
    let engine = Arc::new(QuoteAggregationEngine::new(registry, config.aggregation.clone()));

    let request_log = Arc::new(RequestLog::new());
    let mut service = QuoteService::new(engine, cache.clone()).with_request_log(Arc::clone(&request_log));
    if config.persistence.enabled {
        let repository = quote_repository(config).await?;
        service = service.with_persistence(PersistenceSink::new(repository, cache));
    }

    let jobs = Arc::new(RefreshJobs::new(
        service.clone(),
        request_log,
        config.refresh.clone(),
        config.persistence.retention(),
    ));

    tracing::info!("service graph built");
    Ok(Application {
        state: Arc::new(AppState::new(service)),
        jobs,
        memory_store,
        cleanup_interval: config.cache.cleanup_interval(),
    })
}

async fn cache_store(
    config: &AppConfig,
) -> Result<(Arc<dyn CacheStore>, Option<InMemoryCacheStore>), InfrastructureError> {
    match config.cache.backend {
        CacheBackend::Memory => {
            let store = InMemoryCacheStore::new();
            Ok((Arc::new(store.clone()), Some(store)))
        }
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .ok_or_else(|| InfrastructureError::configuration("cache.redis_url is not set"))?;
            let mut store = RedisCacheStore::connect(url).await?;
            if let Some(prefix) = &config.cache.key_prefix {
                store = store.with_key_prefix(prefix.clone());
            }
            tracing::info!("connected to redis cache");
            Ok((Arc::new(store), None))
        }
    }
}

async fn quote_repository(config: &AppConfig) -> Result<Arc<dyn QuoteRepository>, InfrastructureError> {
    match &config.persistence.database_url {
        Some(url) => {
            let repository = PostgresQuoteRepository::connect(url).await?;
            repository.ensure_schema().await?;
            tracing::info!("connected to postgres");
            Ok(Arc::new(repository))
        }
        None => {
            tracing::info!("no database_url; quote records kept in memory");
            Ok(Arc::new(InMemoryQuoteRepository::new()))
        }
    }
}
