//! # Value Objects
//!
//! Immutable, validated inputs.
//!
//! ## Identity Types
//!
//! - [`CountryCode`], [`CurrencyCode`]: Normalized ISO codes
//! - [`Corridor`]: Country and currency pair a transfer moves along
//!
//! ## Numeric Types
//!
//! - [`SendAmount`]: Positive, finite amount in source currency
//!
//! ## Domain Enums
//!
//! - [`SortBy`]: Ranking keys
//! - [`CorridorAvailability`]: Whether any provider serves a corridor

pub mod amount;
pub mod corridor;
pub mod enums;
pub mod quote_request;
pub mod timestamp;

pub use amount::SendAmount;
pub use corridor::{CountryCode, Corridor, CurrencyCode};
pub use enums::{CorridorAvailability, ParseEnumError, SortBy};
pub use quote_request::QuoteRequest;
pub use timestamp::Timestamp;
