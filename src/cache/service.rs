//! Owned cache service: both caches plus the background expiry sweeper.
//!
//! Constructed once at startup and handed to the resolver as an
//! `Arc<CacheService>`; [`CacheService::shutdown`] stops the sweeper.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;
use tracing::{debug, info};

use super::embedding::{EmbeddingCache, EmbeddingCacheConfig};
use super::error::CacheResult;
use super::vector::{VectorCache, VectorCacheConfig};
use crate::constants::DEFAULT_SWEEP_INTERVAL_SECS;

pub struct CacheService {
    vector: VectorCache,
    embeddings: EmbeddingCache,
    sweep_interval: Duration,
    sweeper_running: AtomicBool,
    shutdown_initiated: AtomicBool,
    shutdown_notify: Notify,
}

impl CacheService {
    pub fn new(
        vector_config: VectorCacheConfig,
        embedding_config: EmbeddingCacheConfig,
    ) -> CacheResult<Self> {
        Ok(Self {
            vector: VectorCache::new(vector_config)?,
            embeddings: EmbeddingCache::new(embedding_config)?,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            sweeper_running: AtomicBool::new(false),
            shutdown_initiated: AtomicBool::new(false),
            shutdown_notify: Notify::new(),
        })
    }

    pub fn with_defaults() -> CacheResult<Self> {
        Self::new(VectorCacheConfig::default(), EmbeddingCacheConfig::default())
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[inline]
    pub fn vector(&self) -> &VectorCache {
        &self.vector
    }

    #[inline]
    pub fn embeddings(&self) -> &EmbeddingCache {
        &self.embeddings
    }

    /// Flushes expired entries from both caches.
    pub fn sweep(&self) {
        self.vector.run_pending_tasks();
        self.embeddings.run_pending_tasks();
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper_running.load(Ordering::Acquire)
    }

    /// Starts the periodic sweeper (no-op if already running).
    pub fn start_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        // AcqRel: only one sweeper may win the swap.
        if self.sweeper_running.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval(service.sweep_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            info!(interval = ?service.sweep_interval, "Cache sweeper started");
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = service.shutdown_notify.notified() => {}
                }
                if service.shutdown_initiated.load(Ordering::Acquire) {
                    break;
                }
                service.sweep();
                debug!(
                    vector_entries = service.vector.len(),
                    embedding_entries = service.embeddings.len(),
                    "Cache sweep complete"
                );
            }
            service.sweeper_running.store(false, Ordering::Release);
            info!("Cache sweeper stopped");
        })
    }

    /// Stops the sweeper (idempotent). Cached data stays readable.
    pub fn shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown_notify.notify_waiters();
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("vector", &self.vector)
            .field("embeddings", &self.embeddings)
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}
