//! # Domain Errors
//!
//! Validation failures raised while constructing domain values.
//!
//! Every variant maps to a client error at the API boundary: these errors are
//! raised before any provider or cache work begins.

use thiserror::Error;

/// Error type for domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Country code is not a valid ISO-3166 code.
    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),

    /// Currency code is not a valid ISO-4217 code.
    #[error("invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    /// Send amount is missing, non-numeric, non-finite, or not positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A required request field is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Generic validation failure.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    /// Creates an invalid amount error.
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount(message.into())
    }

    /// Creates a generic validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
