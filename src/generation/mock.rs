//! Scripted completion service for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::completion::{Completion, CompletionService, SamplingConfig, UsageMetadata};
use super::error::CompletionError;
use super::prompt::Prompt;

/// Replays queued replies, then falls back to a fixed default reply.
pub struct MockCompletionService {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    default_reply: Mutex<Result<String, CompletionError>>,
    delay: Mutex<Option<Duration>>,
    prompts: Mutex<Vec<Prompt>>,
    calls: AtomicUsize,
    usage: UsageMetadata,
}

impl MockCompletionService {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(Ok(default_reply.into())),
            delay: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            usage: UsageMetadata::new(120, 480),
        }
    }

    /// Every call fails with a transport error.
    pub fn failing(reason: impl Into<String>) -> Self {
        let mock = Self::new("");
        *mock.default_reply.lock() = Err(CompletionError::Unavailable {
            reason: reason.into(),
        });
        mock
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: CompletionError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn set_default_reply(&self, reply: impl Into<String>) {
        *self.default_reply.lock() = Ok(reply.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        prompt: &Prompt,
        _sampling: &SamplingConfig,
    ) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.lock().clone());

        reply.map(|text| Completion {
            text,
            usage: self.usage,
            model: self.model_name().to_string(),
            provider: "Mock".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-completion"
    }
}
