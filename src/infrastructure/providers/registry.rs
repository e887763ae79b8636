//! # Provider Registry
//!
//! Lists the providers a fan-out should call.

use crate::infrastructure::providers::traits::QuoteProvider;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of registered providers.
#[async_trait]
pub trait ProviderRegistry: Send + Sync + fmt::Debug {
    /// Returns every registered provider, in registration order.
    async fn providers(&self) -> Vec<Arc<dyn QuoteProvider>>;

    /// Returns the provider with `provider_id` (case-insensitive).
    async fn get_provider(&self, provider_id: &str) -> Option<Arc<dyn QuoteProvider>> {
        self.providers()
            .await
            .into_iter()
            .find(|p| p.provider_id().eq_ignore_ascii_case(provider_id))
    }
}

/// In-process registry.
///
/// Registering a provider whose id is already present replaces the old entry
/// in place, so ids stay unique.
#[derive(Debug, Clone, Default)]
pub struct StaticProviderRegistry {
    providers: Arc<RwLock<Vec<Arc<dyn QuoteProvider>>>>,
}

impl StaticProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a list of providers.
    #[must_use]
    pub fn with_providers(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        let mut unique: Vec<Arc<dyn QuoteProvider>> = Vec::with_capacity(providers.len());
        for provider in providers {
            upsert(&mut unique, provider);
        }
        Self {
            providers: Arc::new(RwLock::new(unique)),
        }
    }

    /// Registers a provider.
    pub async fn register(&self, provider: Arc<dyn QuoteProvider>) {
        let mut providers = self.providers.write().await;
        upsert(&mut providers, provider);
    }

    /// Removes a provider. Returns true if it was registered.
    pub async fn deregister(&self, provider_id: &str) -> bool {
        let mut providers = self.providers.write().await;
        let before = providers.len();
        providers.retain(|p| !p.provider_id().eq_ignore_ascii_case(provider_id));
        providers.len() != before
    }

    /// Returns the number of registered providers.
    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    /// Returns true if no provider is registered.
    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}

fn upsert(providers: &mut Vec<Arc<dyn QuoteProvider>>, provider: Arc<dyn QuoteProvider>) {
    match providers
        .iter_mut()
        .find(|p| p.provider_id().eq_ignore_ascii_case(provider.provider_id()))
    {
        Some(slot) => *slot = provider,
        None => providers.push(provider),
    }
}

#[async_trait]
impl ProviderRegistry for StaticProviderRegistry {
    async fn providers(&self) -> Vec<Arc<dyn QuoteProvider>> {
        self.providers.read().await.clone()
    }
}
