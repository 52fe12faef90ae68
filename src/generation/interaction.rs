//! Generation interaction record and cost estimation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::completion::UsageMetadata;
use crate::constants::{DEFAULT_COST_PER_1K_COMPLETION, DEFAULT_COST_PER_1K_PROMPT};

/// Links generated POIs back to the fallback call that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(pub Uuid);

impl InteractionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InteractionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InteractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Succeeded,
    Failed,
}

/// One row per fallback invocation. Fields are private so a record cannot
/// change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationInteraction {
    id: InteractionId,
    prompt: String,
    raw_response: String,
    model: String,
    provider: String,
    usage: UsageMetadata,
    latency_ms: u64,
    estimated_cost_usd: f64,
    status: InteractionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
}

/// Fields of a new record; consumed by [`GenerationInteraction::succeeded`]
/// and [`GenerationInteraction::failed`].
#[derive(Debug, Clone, Default)]
pub struct InteractionDraft {
    pub prompt: String,
    pub raw_response: String,
    pub model: String,
    pub provider: String,
    pub usage: UsageMetadata,
    pub latency_ms: u64,
}

impl GenerationInteraction {
    pub fn succeeded(draft: InteractionDraft, costs: &CostModel) -> Self {
        Self::build(draft, costs, InteractionStatus::Succeeded, None)
    }

    pub fn failed(draft: InteractionDraft, costs: &CostModel, error: impl Into<String>) -> Self {
        Self::build(draft, costs, InteractionStatus::Failed, Some(error.into()))
    }

    fn build(
        draft: InteractionDraft,
        costs: &CostModel,
        status: InteractionStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            id: InteractionId::new(),
            estimated_cost_usd: costs.estimate(&draft.usage),
            prompt: draft.prompt,
            raw_response: draft.raw_response,
            model: draft.model,
            provider: draft.provider,
            usage: draft.usage,
            latency_ms: draft.latency_ms,
            status,
            error,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> InteractionId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn usage(&self) -> UsageMetadata {
        self.usage
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.estimated_cost_usd
    }

    pub fn status(&self) -> InteractionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_success(&self) -> bool {
        self.status == InteractionStatus::Succeeded
    }
}

/// Per-1K-token USD rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub per_1k_prompt: f64,
    pub per_1k_completion: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            per_1k_prompt: DEFAULT_COST_PER_1K_PROMPT,
            per_1k_completion: DEFAULT_COST_PER_1K_COMPLETION,
        }
    }
}

impl CostModel {
    pub fn estimate(&self, usage: &UsageMetadata) -> f64 {
        f64::from(usage.prompt_tokens) / 1000.0 * self.per_1k_prompt
            + f64::from(usage.completion_tokens) / 1000.0 * self.per_1k_completion
    }
}
