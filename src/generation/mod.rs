//! Generative fallback: prompt, completion call, payload parsing and the
//! interaction record for each invocation.

mod completion;
mod error;
mod interaction;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod parse;
mod prompt;
mod worker;


pub use completion::{
    Completion, CompletionService, GenaiCompletionService, SamplingConfig, UsageMetadata,
};
pub use error::{CompletionError, GenerationError, GenerationResult};
pub use interaction::{
    CostModel, GenerationInteraction, InteractionDraft, InteractionId, InteractionStatus,
};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockCompletionService;
pub use parse::parse_candidates;
pub use prompt::{FallbackSubject, Prompt, build_prompt, build_prompt_with_limit};
pub use worker::{FallbackHandle, FallbackOutcome, FallbackWaitError, GenerativeFallbackWorker};
