use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::cache::RESOLUTION_HEADER;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::resolver::{HybridQuery, LocationQuery, Resolution, SemanticQuery};

#[instrument(skip(state, body))]
pub async fn nearby_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let query: LocationQuery = parse_body(body)?;
    let resolution = state.resolver.resolve_by_location(&query).await?;
    Ok(make_response(resolution))
}

#[instrument(skip(state, body))]
pub async fn search_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let query: SemanticQuery = parse_body(body)?;
    let resolution = state.resolver.resolve_by_semantic_query(&query).await?;
    Ok(make_response(resolution))
}

#[instrument(skip(state, body))]
pub async fn hybrid_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let query: HybridQuery = parse_body(body)?;
    let resolution = state.resolver.resolve_hybrid(&query).await?;
    Ok(make_response(resolution))
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, GatewayError> {
    serde_json::from_value(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))
}

pub(crate) fn make_response(resolution: Resolution) -> Response {
    debug!(
        source = %resolution.source,
        count = resolution.pois.len(),
        "Responding"
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        RESOLUTION_HEADER,
        HeaderValue::from_static(resolution.source.as_header_value()),
    );
    (headers, Json(resolution)).into_response()
}
