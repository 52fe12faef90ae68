use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::RESOLUTION_HEADER;
use crate::resolver::ResolveError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    /// Machine-readable kind, same value as the resolution header.
    pub kind: &'static str,
    pub retryable: bool,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Resolve(e) => match e {
                ResolveError::Validation(_) => StatusCode::BAD_REQUEST,
                ResolveError::UpstreamUnavailable { .. } | ResolveError::Parse { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                ResolveError::FallbackTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
                ResolveError::FallbackAborted => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Resolve(e) => e.code(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let retryable = matches!(&self, GatewayError::Resolve(e) if e.is_retryable());

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), kind, error = %self, "Request failed");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            RESOLUTION_HEADER,
            HeaderValue::from_str(kind).unwrap_or(HeaderValue::from_static("error")),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
            kind,
            retryable,
        });

        (status, headers, body).into_response()
    }
}
