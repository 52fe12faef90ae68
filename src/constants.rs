//! Cross-cutting, shared constants.
//!
//! Secondary values (durations, byte sizes) are derived from the primary ones so
//! modules that share a default cannot drift apart.

use std::time::Duration;

/// Minimum cosine similarity for a semantic cache hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.93;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(DEFAULT_CACHE_TTL_SECS);

pub const DEFAULT_VECTOR_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_EMBEDDING_CACHE_CAPACITY: u64 = 50_000;

/// How often the background sweeper runs pending expiry on both caches.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Generated candidates with the same name closer than this collapse into one.
pub const DEFAULT_DEDUP_RADIUS_M: f64 = 100.0;

pub const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 90;

pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_COMPLETION_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_COMPLETION_TEMPERATURE: f64 = 0.2;

/// Upper bound on how many places the fallback prompt asks for.
pub const DEFAULT_MAX_GENERATED_RESULTS: usize = 15;

pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// USD per 1 000 prompt tokens.
pub const DEFAULT_COST_PER_1K_PROMPT: f64 = 0.0001;
/// USD per 1 000 completion tokens.
pub const DEFAULT_COST_PER_1K_COMPLETION: f64 = 0.0004;

pub const DEFAULT_PERSISTENCE_QUEUE_CAPACITY: usize = 1024;

/// Radius cap for location requests, in kilometers.
pub const MAX_RADIUS_KM: f64 = 500.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_in_design_range() {
        assert!((0.92..=0.95).contains(&DEFAULT_SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_ttl_in_design_range() {
        assert!(DEFAULT_CACHE_TTL >= Duration::from_secs(5 * 60));
        assert!(DEFAULT_CACHE_TTL <= Duration::from_secs(10 * 60));
    }
}
