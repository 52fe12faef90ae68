//! OpenAI-compatible `/embeddings` HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::EmbeddingService;
use super::error::EmbeddingError;
use crate::constants::{DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Error bodies are truncated to this many characters before surfacing.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingClient {
    http: HttpClient,
    config: EmbeddingClientConfig,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self, EmbeddingError> {
        if config.url.trim().is_empty() || config.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding url and model must be set".to_string(),
            });
        }
        let http = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &EmbeddingClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for HttpEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingClient")
            .field("url", &self.config.url)
            .field("model", &self.config.model)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingClient {
    #[instrument(skip(self, text), fields(model = %self.config.model, len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut request = self.http.post(&self.config.url).json(&EmbeddingRequest {
            model: &self.config.model,
            input: text,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::BadStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: EmbeddingResponse =
            resp.json()
                .await
                .map_err(|e| EmbeddingError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::MalformedResponse {
                reason: "response contained no embedding".to_string(),
            })?;

        debug!(dim = vector.len(), "Embedding received");
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
