use std::time::Duration;

use crate::cache::error::{CacheError, CacheResult};
use crate::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_VECTOR_CACHE_CAPACITY,
};

#[derive(Debug, Clone)]
pub struct VectorCacheConfig {
    pub similarity_threshold: f32,
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for VectorCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            ttl: DEFAULT_CACHE_TTL,
            max_capacity: DEFAULT_VECTOR_CACHE_CAPACITY,
        }
    }
}

impl VectorCacheConfig {
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(CacheError::ConfigError {
                reason: format!(
                    "similarity_threshold must be in (0, 1], got {}",
                    self.similarity_threshold
                ),
            });
        }
        if self.ttl.is_zero() {
            return Err(CacheError::ConfigError {
                reason: "ttl must be > 0".to_string(),
            });
        }
        if self.max_capacity == 0 {
            return Err(CacheError::ConfigError {
                reason: "max_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
