use std::time::Duration;

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::generation::{FallbackWaitError, GenerationError};
use crate::spatial::SpatialError;
use crate::validation::ValidationError;

/// External dependency that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    SpatialStore,
    Embedding,
    Completion,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::SpatialStore => "spatial store",
            Upstream::Embedding => "embedding service",
            Upstream::Completion => "completion service",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing failure of a resolve call.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: Upstream, reason: String },

    #[error("fallback payload unusable: {reason}")]
    Parse { reason: String },

    #[error("fallback did not finish within {waited:?}")]
    FallbackTimedOut { waited: Duration },

    #[error("fallback worker stopped before reporting")]
    FallbackAborted,
}

impl ResolveError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::UpstreamUnavailable { .. }
                | ResolveError::FallbackTimedOut { .. }
                | ResolveError::FallbackAborted
        )
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Validation(_) => "validation_error",
            ResolveError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ResolveError::Parse { .. } => "parse_error",
            ResolveError::FallbackTimedOut { .. } => "fallback_timeout",
            ResolveError::FallbackAborted => "fallback_aborted",
        }
    }
}

impl From<SpatialError> for ResolveError {
    fn from(err: SpatialError) -> Self {
        ResolveError::UpstreamUnavailable {
            service: Upstream::SpatialStore,
            reason: err.to_string(),
        }
    }
}

impl From<EmbeddingError> for ResolveError {
    fn from(err: EmbeddingError) -> Self {
        ResolveError::UpstreamUnavailable {
            service: Upstream::Embedding,
            reason: err.to_string(),
        }
    }
}

impl From<GenerationError> for ResolveError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Completion(e) => ResolveError::UpstreamUnavailable {
                service: Upstream::Completion,
                reason: e.to_string(),
            },
            other => ResolveError::Parse {
                reason: other.to_string(),
            },
        }
    }
}

impl From<&FallbackWaitError> for ResolveError {
    fn from(err: &FallbackWaitError) -> Self {
        match err {
            FallbackWaitError::TimedOut { waited, .. } => {
                ResolveError::FallbackTimedOut { waited: *waited }
            }
            FallbackWaitError::Aborted { .. } => ResolveError::FallbackAborted,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolverConfigError {
    #[error("invalid resolver configuration: {reason}")]
    Invalid { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CompletionError;

    #[test]
    fn test_generation_errors_map_to_taxonomy() {
        let upstream: ResolveError = GenerationError::Completion(CompletionError::Unavailable {
            reason: "503".to_string(),
        })
        .into();
        assert!(matches!(
            upstream,
            ResolveError::UpstreamUnavailable {
                service: Upstream::Completion,
                ..
            }
        ));
        assert!(upstream.is_retryable());

        let parse: ResolveError = GenerationError::NoCandidates.into();
        assert!(matches!(parse, ResolveError::Parse { .. }));
        assert!(!parse.is_retryable());
        assert_eq!(parse.code(), "parse_error");
    }

    #[test]
    fn test_spatial_and_embedding_errors_are_upstream() {
        let spatial: ResolveError = SpatialError::Unavailable {
            reason: "down".to_string(),
        }
        .into();
        assert!(spatial.to_string().starts_with("spatial store unavailable"));

        let embedding: ResolveError = EmbeddingError::EmptyInput.into();
        assert!(matches!(
            embedding,
            ResolveError::UpstreamUnavailable {
                service: Upstream::Embedding,
                ..
            }
        ));
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err: ResolveError = ValidationError::EmptyQuery.into();
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "validation_error");
    }
}
