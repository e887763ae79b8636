//! # REST Routes
//!
//! Router construction and HTTP middleware.

use super::handlers::{
    AppState, get_quotes, health_check, invalidate_all, invalidate_corridors, invalidate_provider,
};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::routing::{delete, get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Header carrying the request id.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Builds the application router.
///
/// Requests keep an incoming `x-request-id` or get a fresh UUID, and the id is
/// echoed on the response. Bodies are gzip-compressed when the client accepts it.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/cache", delete(invalidate_all))
        .route("/cache/corridors", delete(invalidate_corridors))
        .route("/cache/providers/{provider_id}", delete(invalidate_provider));

    Router::new()
        .route("/quotes", get(get_quotes))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
