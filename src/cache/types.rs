use serde::Serialize;

pub const RESOLUTION_HEADER: &str = "X-Atlas-Resolution";
pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_READY: &str = "ready";
pub const STATUS_NOT_READY: &str = "not_ready";
pub const STATUS_ERROR: &str = "error";

/// Which layer produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionSource {
    ExactCacheHit,
    SemanticCacheHit,
    Database,
    Generated,
}

impl ResolutionSource {
    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ResolutionSource::ExactCacheHit => "EXACT_CACHE_HIT",
            ResolutionSource::SemanticCacheHit => "SEMANTIC_CACHE_HIT",
            ResolutionSource::Database => "DATABASE",
            ResolutionSource::Generated => "GENERATED",
        }
    }

    #[inline]
    pub fn is_cache_hit(&self) -> bool {
        matches!(
            self,
            ResolutionSource::ExactCacheHit | ResolutionSource::SemanticCacheHit
        )
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}
