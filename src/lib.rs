//! Atlas library crate (used by the server binary and integration tests).
//!
//! # Resolution pipeline
//!
//! Each request to [`Resolver`] walks the same layers in order and stops at the
//! first one that answers:
//!
//! 1. exact cache (scope-qualified BLAKE3 key)
//! 2. semantic cache (cosine similarity over cached query embeddings)
//! 3. spatial store ([`SpatialQueryPort`])
//! 4. generative fallback ([`GenerativeFallbackWorker`]), whose output is
//!    enriched, deduplicated, persisted in the background and cached
//!
//! ## Ports
//! - [`SpatialQueryPort`], [`EmbeddingService`], [`CompletionService`] and
//!   [`PersistencePort`] are the seams to external systems.
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod generation;
pub mod geo;
pub mod hashing;
pub mod persistence;
pub mod poi;
pub mod resolver;
pub mod scoring;
pub mod spatial;
pub mod validation;

pub use cache::{
    CacheScope, CacheService, EmbeddingCache, EmbeddingCacheConfig, RESOLUTION_HEADER,
    ResolutionSource, VectorCache, VectorCacheConfig,
};
pub use config::{Config, ConfigError};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingService;
pub use embedding::{EmbeddingError, EmbeddingService, HttpEmbeddingClient, cosine_similarity};
#[cfg(any(test, feature = "mock"))]
pub use generation::MockCompletionService;
pub use generation::{
    CompletionService, GenaiCompletionService, GenerationInteraction, GenerativeFallbackWorker,
    InteractionId,
};
pub use geo::{Coordinate, CoordinateError};
pub use hashing::{CacheKey, cache_key, hash_to_u64, normalize_query};
#[cfg(any(test, feature = "mock"))]
pub use persistence::InMemoryPersistence;
pub use persistence::{FilePersistence, PersistencePort, PersistenceQueue, PersistenceWarning};
pub use poi::{Poi, PoiAttributes, PoiSource};
pub use resolver::{
    HybridQuery, LocationQuery, Resolution, ResolveError, Resolver, ResolverConfig, SemanticQuery,
};
pub use scoring::HybridScorer;
pub use spatial::{InMemorySpatialStore, SpatialError, SpatialQueryPort};
pub use validation::ValidationError;
