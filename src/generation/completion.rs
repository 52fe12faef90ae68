//! Completion service port and the genai-backed client.

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::CompletionError;
use super::prompt::Prompt;
use crate::constants::{DEFAULT_COMPLETION_MAX_TOKENS, DEFAULT_COMPLETION_TEMPERATURE};

/// Bounded output size and a fixed temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_COMPLETION_TEMPERATURE,
            max_tokens: DEFAULT_COMPLETION_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl UsageMetadata {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: UsageMetadata,
    pub model: String,
    pub provider: String,
}

#[async_trait]
/// Text completion from a generative model.
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        sampling: &SamplingConfig,
    ) -> Result<Completion, CompletionError>;

    fn model_name(&self) -> &str;
}

/// Multi-provider client; the provider is inferred by genai from the model name.
pub struct GenaiCompletionService {
    client: Client,
    model: String,
}

impl GenaiCompletionService {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for GenaiCompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiCompletionService")
            .field("model", &self.model)
            .finish()
    }
}

fn token_count(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

#[async_trait]
impl CompletionService for GenaiCompletionService {
    #[instrument(skip(self, prompt, sampling), fields(model = %self.model))]
    async fn complete(
        &self,
        prompt: &Prompt,
        sampling: &SamplingConfig,
    ) -> Result<Completion, CompletionError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(prompt.system.clone()),
            ChatMessage::user(prompt.user.clone()),
        ]);
        let options = ChatOptions::default()
            .with_temperature(sampling.temperature)
            .with_max_tokens(sampling.max_tokens);

        let resp = self
            .client
            .exec_chat(&self.model, request, Some(&options))
            .await
            .map_err(|e| CompletionError::RequestFailed {
                reason: e.to_string(),
            })?;

        let text = resp.first_text().unwrap_or_default().to_string();
        let prompt_tokens = token_count(resp.usage.prompt_tokens);
        let completion_tokens = token_count(resp.usage.completion_tokens);
        let mut usage = UsageMetadata::new(prompt_tokens, completion_tokens);
        if let Some(total) = resp.usage.total_tokens.and_then(|v| u32::try_from(v).ok()) {
            usage.total_tokens = total;
        }

        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            chars = text.len(),
            "Completion received"
        );

        Ok(Completion {
            text,
            usage,
            model: self.model.clone(),
            provider: format!("{:?}", resp.model_iden.adapter_kind),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
