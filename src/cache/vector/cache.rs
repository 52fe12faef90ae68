use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, instrument};

use crate::cache::error::CacheResult;
use crate::cache::scope::CacheScope;
use crate::cache::stats::{CacheStats, CacheStatsSnapshot};
use crate::embedding::cosine_similarity;
use crate::hashing::CacheKey;

use super::config::VectorCacheConfig;
use super::types::{SimilarHit, VectorCacheEntry};

/// Result sets keyed by exact request key, searchable by embedding similarity.
///
/// Backed by a moka cache: TTL expiry is lazy on access plus whatever the
/// sweeper flushes, and capacity eviction is handled by moka's LRU/LFU policy.
pub struct VectorCache {
    entries: Cache<CacheKey, Arc<VectorCacheEntry>>,
    config: VectorCacheConfig,
    stats: CacheStats,
}

impl VectorCache {
    pub fn new(config: VectorCacheConfig) -> CacheResult<Self> {
        config.validate()?;
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        Ok(Self {
            entries,
            config,
            stats: CacheStats::default(),
        })
    }

    pub fn config(&self) -> &VectorCacheConfig {
        &self.config
    }

    #[inline]
    pub fn similarity_threshold(&self) -> f32 {
        self.config.similarity_threshold
    }

    /// Exact lookup by composite key.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<VectorCacheEntry>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.config.ttl) => {
                self.stats.record_hit();
                Some(entry)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Nearest-neighbour lookup within `scope`.
    ///
    /// Returns the entry with the highest cosine similarity at or above the
    /// configured threshold. Equal similarities go to the most recently
    /// created entry. Entries without an embedding, with a mismatched
    /// dimension, or from a different scope are never candidates.
    #[instrument(skip(self, embedding), fields(dim = embedding.len()))]
    pub fn get_similar(&self, embedding: &[f32], scope: &CacheScope) -> Option<SimilarHit> {
        let threshold = self.config.similarity_threshold;
        let mut best: Option<SimilarHit> = None;
        let mut scanned = 0usize;

        for (_, entry) in self.entries.iter() {
            if entry.is_expired(self.config.ttl) || !entry.scope.is_comparable(scope) {
                continue;
            }
            let Some(stored) = entry.embedding.as_deref() else {
                continue;
            };
            scanned += 1;

            let Some(similarity) = cosine_similarity(embedding, stored) else {
                continue;
            };
            if similarity < threshold {
                continue;
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    similarity > current.similarity
                        || (similarity == current.similarity
                            && entry.created_at > current.entry.created_at)
                }
            };
            if better {
                best = Some(SimilarHit { entry, similarity });
            }
        }

        debug!(
            scanned,
            best = best.as_ref().map(|h| h.similarity),
            threshold,
            "Semantic scan complete"
        );

        if best.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        best
    }

    /// Inserts or overwrites an entry.
    pub fn set(&self, key: CacheKey, entry: VectorCacheEntry) {
        self.entries.insert(key, Arc::new(entry));
        self.stats.record_insert();
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<VectorCacheEntry>> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry count; eventually consistent until [`Self::run_pending_tasks`] runs.
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

impl std::fmt::Debug for VectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorCache")
            .field("entries", &self.entries.entry_count())
            .field("config", &self.config)
            .finish()
    }
}
