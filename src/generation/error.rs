use thiserror::Error;

/// Transport-level failure of the completion service.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("completion request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("completion service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Terminal failure of one fallback invocation. Never retried inside the worker.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model payload is not valid JSON: {reason}")]
    InvalidPayload { reason: String },

    #[error("model payload contained no usable candidates")]
    NoCandidates,

    #[error("no candidate had a usable name and coordinate")]
    NoUsableCandidates,
}

impl GenerationError {
    /// Whether the payload itself was unusable, as opposed to transport failure.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(self, GenerationError::Completion(_))
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;
