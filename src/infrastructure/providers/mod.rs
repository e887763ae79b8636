//! # Provider Adapters
//!
//! Port and adapters for money-transfer provider integrations.
//!
//! - [`traits`] - The [`QuoteProvider`] port
//! - [`registry`] - Listing of registered providers
//! - [`fixed_rate`] - Static rate table adapter
//! - [`error`] - Transport-class failures

pub mod error;
pub mod fixed_rate;
pub mod registry;
pub mod traits;

pub use error::{ProviderError, ProviderResult};
pub use fixed_rate::{FixedRateEntry, FixedRateProvider, FixedRateProviderConfig};
pub use registry::{ProviderRegistry, StaticProviderRegistry};
pub use traits::{DEFAULT_PROVIDER_TIMEOUT, QuoteProvider};
