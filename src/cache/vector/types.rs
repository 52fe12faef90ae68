use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::ResolutionSource;
use crate::cache::scope::CacheScope;
use crate::poi::Poi;

/// A cached result set and everything needed to compare it against a new request.
#[derive(Debug, Clone)]
pub struct VectorCacheEntry {
    /// Normalized query text (empty for location-only requests).
    pub query_text: String,
    /// Owned copy of the query embedding; `None` entries only serve exact lookups.
    pub embedding: Option<Vec<f32>>,
    pub results: Vec<Poi>,
    pub scope: CacheScope,
    /// Layer that originally produced `results`.
    pub origin: ResolutionSource,
    pub created_at: Instant,
}

impl VectorCacheEntry {
    pub fn new(
        query_text: impl Into<String>,
        embedding: Option<Vec<f32>>,
        results: Vec<Poi>,
        scope: CacheScope,
        origin: ResolutionSource,
    ) -> Self {
        Self {
            query_text: query_text.into(),
            embedding,
            results,
            scope,
            origin,
            created_at: Instant::now(),
        }
    }

    #[inline]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    #[inline]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

/// Result of [`super::VectorCache::get_similar`].
#[derive(Debug, Clone)]
pub struct SimilarHit {
    pub entry: Arc<VectorCacheEntry>,
    pub similarity: f32,
}
