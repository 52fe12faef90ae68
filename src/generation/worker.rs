//! Generative fallback worker.
//!
//! Each invocation runs on its own tokio task and reports exactly one
//! [`FallbackOutcome`] through a oneshot channel. The caller waits on a
//! [`FallbackHandle`] with a bound; dropping the handle or timing out aborts
//! the task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::completion::{CompletionService, SamplingConfig};
use super::error::{GenerationError, GenerationResult};
use super::interaction::{CostModel, GenerationInteraction, InteractionDraft};
use super::parse::parse_candidates;
use super::prompt::{FallbackSubject, Prompt, build_prompt_with_limit};
use crate::constants::DEFAULT_MAX_GENERATED_RESULTS;
use crate::poi::CandidatePoi;

/// Result of one fallback invocation plus its interaction record.
#[derive(Debug)]
pub struct FallbackOutcome {
    pub interaction: GenerationInteraction,
    pub result: GenerationResult<Vec<CandidatePoi>>,
}

/// The worker produced no outcome. Carries a failed interaction record so the
/// attempt can still be persisted.
#[derive(Debug, Error)]
pub enum FallbackWaitError {
    #[error("fallback timed out after {waited:?}")]
    TimedOut {
        waited: Duration,
        interaction: Box<GenerationInteraction>,
    },

    #[error("fallback worker stopped before reporting")]
    Aborted { interaction: Box<GenerationInteraction> },
}

impl FallbackWaitError {
    pub fn interaction(&self) -> &GenerationInteraction {
        match self {
            FallbackWaitError::TimedOut { interaction, .. }
            | FallbackWaitError::Aborted { interaction } => interaction,
        }
    }

    pub fn into_interaction(self) -> GenerationInteraction {
        match self {
            FallbackWaitError::TimedOut { interaction, .. }
            | FallbackWaitError::Aborted { interaction } => *interaction,
        }
    }
}

pub struct FallbackHandle {
    rx: oneshot::Receiver<FallbackOutcome>,
    task: JoinHandle<()>,
    prompt: Prompt,
    model: String,
    costs: CostModel,
    started: Instant,
}

impl FallbackHandle {
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Awaits the single outcome for at most `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<FallbackOutcome, FallbackWaitError> {
        let received = tokio::time::timeout(timeout, &mut self.rx).await;
        match received {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(FallbackWaitError::Aborted {
                interaction: Box::new(self.failed_interaction("worker stopped before reporting")),
            }),
            Err(_) => {
                self.task.abort();
                warn!(?timeout, "Fallback worker timed out");
                Err(FallbackWaitError::TimedOut {
                    waited: timeout,
                    interaction: Box::new(
                        self.failed_interaction(format!("timed out after {timeout:?}")),
                    ),
                })
            }
        }
    }

    fn failed_interaction(&self, reason: impl Into<String>) -> GenerationInteraction {
        GenerationInteraction::failed(
            InteractionDraft {
                prompt: self.prompt.full_text(),
                model: self.model.clone(),
                latency_ms: elapsed_ms(self.started),
                ..Default::default()
            },
            &self.costs,
            reason,
        )
    }
}

impl Drop for FallbackHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for FallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackHandle")
            .field("model", &self.model)
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct GenerativeFallbackWorker {
    completion: Arc<dyn CompletionService>,
    sampling: SamplingConfig,
    costs: CostModel,
    max_results: usize,
}

impl GenerativeFallbackWorker {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            sampling: SamplingConfig::default(),
            costs: CostModel::default(),
            max_results: DEFAULT_MAX_GENERATED_RESULTS,
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Starts one invocation on a new task.
    pub fn spawn(&self, subject: FallbackSubject) -> FallbackHandle {
        let prompt = build_prompt_with_limit(&subject, self.max_results);
        let (tx, rx) = oneshot::channel();

        let completion = Arc::clone(&self.completion);
        let sampling = self.sampling;
        let costs = self.costs;
        let task_prompt = prompt.clone();
        let task = tokio::spawn(async move {
            let outcome = run_once(completion.as_ref(), &task_prompt, &sampling, &costs).await;
            if tx.send(outcome).is_err() {
                debug!("Fallback outcome discarded; caller no longer waiting");
            }
        });

        FallbackHandle {
            rx,
            task,
            prompt,
            model: self.completion.model_name().to_string(),
            costs: self.costs,
            started: Instant::now(),
        }
    }
}

impl std::fmt::Debug for GenerativeFallbackWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeFallbackWorker")
            .field("model", &self.completion.model_name())
            .field("sampling", &self.sampling)
            .field("max_results", &self.max_results)
            .finish()
    }
}

async fn run_once(
    completion: &dyn CompletionService,
    prompt: &Prompt,
    sampling: &SamplingConfig,
    costs: &CostModel,
) -> FallbackOutcome {
    let started = Instant::now();
    let mut draft = InteractionDraft {
        prompt: prompt.full_text(),
        model: completion.model_name().to_string(),
        ..Default::default()
    };

    let response = completion.complete(prompt, sampling).await;
    draft.latency_ms = elapsed_ms(started);

    let result = match response {
        Ok(c) => {
            draft.raw_response = c.text;
            draft.model = c.model;
            draft.provider = c.provider;
            draft.usage = c.usage;
            parse_candidates(&draft.raw_response).and_then(require_usable)
        }
        Err(e) => Err(GenerationError::from(e)),
    };

    let interaction = match &result {
        Ok(_) => GenerationInteraction::succeeded(draft, costs),
        Err(e) => GenerationInteraction::failed(draft, costs, e.to_string()),
    };

    info!(
        interaction_id = %interaction.id(),
        model = interaction.model(),
        prompt_tokens = interaction.usage().prompt_tokens,
        completion_tokens = interaction.usage().completion_tokens,
        latency_ms = interaction.latency_ms(),
        cost_usd = interaction.estimated_cost_usd(),
        candidates = result.as_ref().map_or(0, Vec::len),
        success = result.is_ok(),
        "Fallback invocation finished"
    );

    FallbackOutcome {
        interaction,
        result,
    }
}

/// A payload whose candidates would all be rejected by enrichment is a failed
/// invocation, so the record's status matches what the caller sees.
fn require_usable(candidates: Vec<CandidatePoi>) -> GenerationResult<Vec<CandidatePoi>> {
    if candidates.iter().any(CandidatePoi::is_usable) {
        Ok(candidates)
    } else {
        Err(GenerationError::NoUsableCandidates)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
