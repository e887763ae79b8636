//! # REST Handlers
//!
//! Request handlers, query parameter types and response DTOs.

use crate::application::services::quote_aggregation::FetchOptions;
use crate::application::services::quote_service::QuoteService;
use crate::application::services::tiered_cache::CacheStatsSnapshot;
use crate::domain::entities::aggregate_response::{AggregateResponse, QuoteFilters};
use crate::domain::entities::quote::Quote;
use crate::domain::errors::DomainError;
use crate::domain::value_objects::amount::{SendAmount, parse_decimal};
use crate::domain::value_objects::corridor::{CountryCode, Corridor};
use crate::domain::value_objects::enums::SortBy;
use crate::domain::value_objects::quote_request::QuoteRequest;
use crate::domain::value_objects::timestamp::Timestamp;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Application State
// ============================================================================

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Quote orchestration.
    pub quote_service: QuoteService,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(quote_service: QuoteService) -> Self {
        Self { quote_service }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error mapped to an HTTP status.
///
/// Provider, cache and persistence failures never reach a handler as errors,
/// so only client input is rejected.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid client input (400).
    BadRequest(String),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::BadRequest(message) => {
                tracing::debug!(error = %message, "request rejected");
                (StatusCode::BAD_REQUEST, "bad_request", message)
            }
        };
        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Quotes
// ============================================================================

/// Query parameters of `GET /quotes`.
///
/// Every field is read as text so validation can name the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteQueryParams {
    /// Source country, alpha-2 or alpha-3.
    pub source_country: Option<String>,
    /// Destination country, alpha-2 or alpha-3.
    pub dest_country: Option<String>,
    /// Source currency.
    pub source_currency: Option<String>,
    /// Destination currency.
    pub dest_currency: Option<String>,
    /// Amount to send.
    pub amount: Option<String>,
    /// Ranking criterion; unknown values rank by best rate.
    pub sort_by: Option<String>,
    /// Bypass cache reads.
    pub force_refresh: Option<String>,
    /// Maximum fee.
    pub max_fee: Option<String>,
    /// Maximum delivery time in minutes.
    pub max_delivery_time: Option<String>,
    /// Payment method substring.
    pub payment_method: Option<String>,
    /// Delivery method substring.
    pub delivery_method: Option<String>,
}

impl QuoteQueryParams {
    /// Validates the parameters into a request and fetch options.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` naming the first invalid field.
    pub fn validate(&self) -> Result<(QuoteRequest, FetchOptions), ApiError> {
        let corridor = Corridor::parse(
            required(&self.source_country, "source_country")?,
            required(&self.dest_country, "dest_country")?,
            required(&self.source_currency, "source_currency")?,
            required(&self.dest_currency, "dest_currency")?,
        )?;
        let amount = SendAmount::parse(required(&self.amount, "amount")?)?;

        let filters = QuoteFilters {
            max_fee: optional_number(&self.max_fee, "max_fee")?,
            max_delivery_time_minutes: self
                .max_delivery_time
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim().parse::<u32>().map_err(|_| {
                        ApiError::bad_request(format!("max_delivery_time '{s}' is not a whole number of minutes"))
                    })
                })
                .transpose()?,
            payment_method: non_blank(&self.payment_method),
            delivery_method: non_blank(&self.delivery_method),
        };

        let mut options = FetchOptions::sorted_by(
            self.sort_by
                .as_deref()
                .map_or_else(SortBy::default, SortBy::parse_lenient),
        )
        .with_filters(filters);
        if self.force_refresh.as_deref().is_some_and(is_truthy) {
            options = options.force_refresh();
        }

        Ok((QuoteRequest::new(corridor, amount), options))
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing required parameter '{field}'")))
}

fn optional_number(value: &Option<String>, field: &str) -> Result<Option<f64>, ApiError> {
    let Some(raw) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_decimal(raw)
        .filter(|v| *v >= 0.0)
        .map(Some)
        .ok_or_else(|| ApiError::bad_request(format!("{field} '{raw}' is not a non-negative number")))
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Body of `GET /quotes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotesResponse {
    /// True when at least one quote survived ranking.
    pub success: bool,
    /// Ranked quotes.
    pub quotes: Vec<Quote>,
    /// One raw result per provider.
    pub all_providers: Vec<Quote>,
    /// Served from cache.
    pub cache_hit: bool,
    /// Recomputed from the corridor rate cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_calculation: Option<bool>,
    /// Wall-clock seconds spent answering.
    pub elapsed_seconds: f64,
    /// Amount sent.
    pub amount: f64,
    /// Source country, alpha-2.
    pub source_country: String,
    /// Destination country, alpha-2.
    pub dest_country: String,
    /// Source currency.
    pub source_currency: String,
    /// Destination currency.
    pub dest_currency: String,
    /// When the underlying quotes were produced.
    pub timestamp: Timestamp,
    /// Filters applied to `quotes`.
    pub filters_applied: QuoteFilters,
    /// Ranking criterion.
    pub sort_by: SortBy,
    /// Why `quotes` is empty, if it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<AggregateResponse> for QuotesResponse {
    fn from(response: AggregateResponse) -> Self {
        let corridor = response.corridor;
        Self {
            success: response.success,
            quotes: response.results,
            all_providers: response.all_results,
            cache_hit: response.cache_hit,
            rate_calculation: response.rate_calculation.then_some(true),
            elapsed_seconds: response.elapsed_seconds,
            amount: response.amount.get(),
            source_country: corridor.source_country().as_str().to_string(),
            dest_country: corridor.dest_country().as_str().to_string(),
            source_currency: corridor.source_currency().as_str().to_string(),
            dest_currency: corridor.dest_currency().as_str().to_string(),
            timestamp: response.timestamp,
            filters_applied: response.filters_applied,
            sort_by: response.sort_by,
            error_message: response.error_message,
        }
    }
}

/// `GET /quotes`
pub async fn get_quotes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuoteQueryParams>,
) -> Result<Json<QuotesResponse>, ApiError> {
    let (request, options) = params.validate()?;
    let response = state.quote_service.get_quotes(&request, &options).await;
    Ok(Json(response.into()))
}

// ============================================================================
// Health
// ============================================================================

/// Body of `GET /api/v1/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Cache backend name.
    pub cache_backend: String,
    /// Registered providers.
    pub providers: usize,
    /// Cache counters.
    pub cache: CacheStatsSnapshot,
}

/// `GET /api/v1/health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let service = &state.quote_service;
    let providers = service.engine().registry().providers().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_backend: service.cache().store().backend_name().to_string(),
        providers,
        cache: service.cache().stats().snapshot(),
    })
}

// ============================================================================
// Cache administration
// ============================================================================

/// Body of cache invalidation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationResponse {
    /// Cache keys removed.
    pub removed: u64,
}

/// Query parameters of `DELETE /api/v1/cache/corridors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorridorInvalidationParams {
    /// Source country; omitted matches any.
    pub source_country: Option<String>,
    /// Destination country; omitted matches any.
    pub dest_country: Option<String>,
}

/// `DELETE /api/v1/cache`
pub async fn invalidate_all(State(state): State<Arc<AppState>>) -> Json<InvalidationResponse> {
    let removed = state.quote_service.cache().invalidate_all().await;
    Json(InvalidationResponse { removed })
}

/// `DELETE /api/v1/cache/corridors`
pub async fn invalidate_corridors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CorridorInvalidationParams>,
) -> Result<Json<InvalidationResponse>, ApiError> {
    let source = non_blank(&params.source_country)
        .map(|s| CountryCode::parse(&s))
        .transpose()?;
    let dest = non_blank(&params.dest_country)
        .map(|s| CountryCode::parse(&s))
        .transpose()?;

    let removed = state
        .quote_service
        .cache()
        .invalidate_by_corridor(source.as_ref(), dest.as_ref())
        .await;
    Ok(Json(InvalidationResponse { removed }))
}

/// `DELETE /api/v1/cache/providers/{provider_id}`
pub async fn invalidate_provider(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<InvalidationResponse>, ApiError> {
    let provider_id = provider_id.trim();
    if provider_id.is_empty() {
        return Err(ApiError::bad_request("provider_id must not be empty"));
    }
    let removed = state
        .quote_service
        .cache()
        .invalidate_provider(provider_id)
        .await;
    Ok(Json(InvalidationResponse { removed }))
}
