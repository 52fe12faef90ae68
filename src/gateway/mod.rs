//! HTTP gateway (Axum) over the three resolve operations.
//!
//! Every resolve response carries `X-Atlas-Resolution` naming the layer that
//! answered; error responses carry the error kind in the same header.

pub mod error;
pub mod handler;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{hybrid_handler, nearby_handler, search_handler};
pub use state::HandlerState;

use crate::cache::{
    CacheStatsSnapshot, RESOLUTION_HEADER, STATUS_HEALTHY, STATUS_NOT_READY, STATUS_READY,
};

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/v1/pois/nearby", post(nearby_handler))
        .route("/v1/pois/search", post(search_handler))
        .route("/v1/pois/hybrid", post(hybrid_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
    pub caches: CacheReport,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub spatial_store: &'static str,
}

#[derive(serde::Serialize)]
pub struct CacheReport {
    pub vector_entries: u64,
    pub embedding_entries: u64,
    pub vector: CacheStatsSnapshot,
    pub embedding: CacheStatsSnapshot,
    pub dropped_persistence_jobs: u64,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(RESOLUTION_HEADER, HeaderValue::from_static(STATUS_HEALTHY));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let resolver = &state.resolver;
    let spatial_status = if resolver.is_ready().await {
        STATUS_READY
    } else {
        STATUS_NOT_READY
    };

    let components = ComponentStatus {
        http: STATUS_READY,
        spatial_store: spatial_status,
    };
    let is_ready = components.spatial_store == STATUS_READY;

    let caches = resolver.caches();
    let report = CacheReport {
        vector_entries: caches.vector().len(),
        embedding_entries: caches.embeddings().len(),
        vector: caches.vector().stats(),
        embedding: caches.embeddings().stats(),
        dropped_persistence_jobs: resolver.persistence().dropped_jobs(),
    };

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(RESOLUTION_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
            caches: report,
        }),
    )
        .into_response()
}
