//! Exact/semantic result cache and the text → embedding cache.

pub mod embedding;
pub mod error;
pub mod scope;
pub mod service;
pub mod stats;
pub mod types;
pub mod vector;

pub use embedding::{EmbeddingCache, EmbeddingCacheConfig, EmbeddingCacheEntry};
pub use error::{CacheError, CacheResult};
pub use scope::CacheScope;
pub use service::CacheService;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use types::{
    RESOLUTION_HEADER, ResolutionSource, STATUS_ERROR, STATUS_HEALTHY, STATUS_NOT_READY,
    STATUS_READY,
};
pub use vector::{SimilarHit, VectorCache, VectorCacheConfig, VectorCacheEntry};
