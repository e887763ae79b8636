//! # Application Errors
//!
//! Error types for the application layer.
//!
//! Most failures in the quote flow never surface as errors: provider failures
//! become failed quotes, cache failures become misses and persistence failures
//! are logged. What remains is listed here.
//!
//! # Error Hierarchy
//!
//! ```text
//! ApplicationError
//! └── Infrastructure(InfrastructureError) - Cache or repository failures
//!
//! AggregationError                        - No provider registered
//! ```
//!
//! # Examples
//!
//! ```
//! use remit_quotes::application::error::{ApplicationError, InfrastructureError};
//!
//! let infra_err = InfrastructureError::configuration("redis_url missing");
//! let app_err: ApplicationError = infra_err.into();
//! assert!(!app_err.is_retryable());
//! ```

use crate::infrastructure::cache::CacheError;
use crate::infrastructure::persistence::RepositoryError;
use thiserror::Error;

/// Infrastructure layer error.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Cache store error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InfrastructureError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true if this error is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cache(e) => e.is_connection(),
            Self::Repository(e) => e.is_connection(),
            Self::Configuration(_) => false,
        }
    }
}

/// Failure of the provider fan-out as a whole.
///
/// Individual provider failures are never aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// The registry lists no provider.
    #[error("no quote providers are registered")]
    NoProvidersRegistered,
}

/// Application layer error, returned by the maintenance operations.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Infrastructure error from external systems.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] InfrastructureError),
}

impl ApplicationError {
    /// Returns true if this error is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Infrastructure(e) => e.is_retryable(),
        }
    }
}

impl From<CacheError> for ApplicationError {
    fn from(err: CacheError) -> Self {
        Self::Infrastructure(err.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::Infrastructure(err.into())
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_error_from_cache_error() {
        let err: InfrastructureError = CacheError::connection("refused").into();
        assert!(err.to_string().contains("cache"));
        assert!(err.is_retryable());
    }

    #[test]
    fn infrastructure_error_from_repository_error() {
        let err: InfrastructureError = RepositoryError::query("syntax error").into();
        assert!(err.to_string().contains("syntax error"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn infrastructure_error_configuration() {
        let err = InfrastructureError::configuration("missing redis_url");
        assert!(err.to_string().contains("configuration"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn aggregation_error_display() {
        let err = AggregationError::NoProvidersRegistered;
        assert!(err.to_string().contains("no quote providers"));
    }

    #[test]
    fn application_error_retryable_from_infrastructure() {
        let err: ApplicationError = CacheError::connection("timeout").into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("infrastructure"));
    }

    #[test]
    fn application_error_from_repository_query_is_final() {
        let err: ApplicationError = RepositoryError::query("bad column").into();
        assert!(!err.is_retryable());
    }
}
