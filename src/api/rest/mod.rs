//! # REST API
//!
//! HTTP surface of the quote service using axum.
//!
//! # Endpoints
//!
//! ## Quotes
//! - `GET /quotes` - Ranked quotes for a corridor and amount
//!
//! ## Health
//! - `GET /api/v1/health` - Liveness, provider count and cache counters
//!
//! ## Cache administration
//! - `DELETE /api/v1/cache` - Invalidate every tier
//! - `DELETE /api/v1/cache/corridors` - Invalidate by country pair, either side optional
//! - `DELETE /api/v1/cache/providers/{provider_id}` - Invalidate entries mentioning a provider
//!
//! # Usage
//!
//! ```ignore
//! use remit_quotes::api::rest::{create_router, AppState};
//! use std::sync::Arc;
//!
//! let router = create_router(Arc::new(AppState::new(quote_service)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    ApiError, AppState, CorridorInvalidationParams, ErrorResponse, HealthResponse,
    InvalidationResponse, QuoteQueryParams, QuotesResponse,
};
pub use routes::create_router;
