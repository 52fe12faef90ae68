//! Text → embedding cache.
//!
//! Keys are normalized query text only; an embedding does not depend on scope.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;

use super::error::{CacheError, CacheResult};
use super::stats::{CacheStats, CacheStatsSnapshot};
use crate::constants::{DEFAULT_CACHE_TTL, DEFAULT_EMBEDDING_CACHE_CAPACITY};
use crate::hashing::normalize_query;

#[derive(Debug, Clone)]
pub struct EmbeddingCacheEntry {
    pub vector: Vec<f32>,
    /// Short description of how the vector was produced (usually the model name).
    pub label: String,
    pub created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct EmbeddingCacheConfig {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            max_capacity: DEFAULT_EMBEDDING_CACHE_CAPACITY,
        }
    }
}

pub struct EmbeddingCache {
    entries: Cache<String, Arc<EmbeddingCacheEntry>>,
    ttl: Duration,
    stats: CacheStats,
}

impl EmbeddingCache {
    pub fn new(config: EmbeddingCacheConfig) -> CacheResult<Self> {
        if config.ttl.is_zero() || config.max_capacity == 0 {
            return Err(CacheError::ConfigError {
                reason: "embedding cache ttl and max_capacity must be > 0".to_string(),
            });
        }
        Ok(Self {
            entries: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
            ttl: config.ttl,
            stats: CacheStats::default(),
        })
    }

    pub fn get(&self, text: &str) -> Option<Arc<EmbeddingCacheEntry>> {
        let key = normalize_query(text);
        match self.entries.get(&key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                self.stats.record_hit();
                Some(entry)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn set(&self, text: &str, vector: Vec<f32>, label: impl Into<String>) {
        let key = normalize_query(text);
        if key.is_empty() || vector.is_empty() {
            return;
        }
        self.entries.insert(
            key,
            Arc::new(EmbeddingCacheEntry {
                vector,
                label: label.into(),
                created_at: Instant::now(),
            }),
        );
        self.stats.record_insert();
    }

    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}
