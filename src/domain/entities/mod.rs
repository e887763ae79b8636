//! # Domain Entities
//!
//! - [`Quote`]: One provider's answer for a corridor and amount
//! - [`CorridorRateSnapshot`]: Amount-independent provider rates and fee tiers
//! - [`AggregateResponse`]: Ranked result of one quote request

pub mod aggregate_response;
pub mod quote;
pub mod rate_snapshot;

pub use aggregate_response::{AggregateResponse, QuoteFilters};
pub use quote::{Quote, QuoteBuilder, compute_destination_amount};
pub use rate_snapshot::{CorridorRateSnapshot, FeeTier, ProviderRate};
