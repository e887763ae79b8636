//! # Quote Provider Trait
//!
//! Port definition for money-transfer provider integrations.
//!
//! Every provider (scraper, partner API, static table) implements
//! [`QuoteProvider`]. The aggregator only ever talks to this trait.
//!
//! # Contract
//!
//! - Business failures (unsupported corridor, currency, amount) are returned
//!   as `Ok(quote)` with `quote.is_success() == false` and a message.
//! - `Err(ProviderError)` is reserved for transport-class failures.
//! - A panic inside an adapter is contained by the aggregator and reported as
//!   a failed quote for that provider only.
//!
//! # Examples
//!
//! ```ignore
//! use remit_quotes::infrastructure::providers::traits::QuoteProvider;
//!
//! struct MyProvider { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl QuoteProvider for MyProvider {
//!     // ... implement required methods
//! }
//! ```

use crate::domain::entities::quote::Quote;
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::infrastructure::providers::error::ProviderResult;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Default per-provider timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Trait implemented once per money-transfer service.
#[async_trait]
pub trait QuoteProvider: Send + Sync + fmt::Debug {
    /// Returns the provider identifier. Compared case-insensitively.
    fn provider_id(&self) -> &str;

    /// Returns this provider's timeout.
    ///
    /// The aggregator clamps the value into its configured bounds.
    fn timeout(&self) -> Duration {
        DEFAULT_PROVIDER_TIMEOUT
    }

    /// Prices `request`.
    ///
    /// # Errors
    ///
    /// - `ProviderError::Timeout` - The provider did not answer in time
    /// - `ProviderError::Connection` - The provider could not be reached
    /// - `ProviderError::Protocol` - The response could not be understood
    async fn get_quote(&self, request: &QuoteRequest) -> ProviderResult<Quote>;

    /// Convenience form that prices the request for its exchange rate.
    ///
    /// The default implementation delegates to [`QuoteProvider::get_quote`].
    ///
    /// # Errors
    ///
    /// Same as [`QuoteProvider::get_quote`].
    async fn get_exchange_rate(&self, request: &QuoteRequest) -> ProviderResult<Quote> {
        self.get_quote(request).await
    }
}
