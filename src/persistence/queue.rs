//! Background persistence queue.
//!
//! Jobs are handed to a dedicated worker task over a bounded channel, so a
//! request that is cancelled after enqueueing cannot abort its write-back.
//! Failures are logged and published on a separate warning channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::PersistencePort;
use crate::constants::DEFAULT_PERSISTENCE_QUEUE_CAPACITY;
use crate::generation::{GenerationInteraction, InteractionId};
use crate::poi::Poi;

const WARNING_CHANNEL_CAPACITY: usize = 256;

/// One fallback's write-back: the interaction row plus any POIs it produced.
#[derive(Debug, Clone)]
pub struct PersistenceJob {
    pub user_id: Option<String>,
    pub interaction: GenerationInteraction,
    pub pois: Vec<Poi>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStage {
    Enqueue,
    Interaction,
    Pois,
}

/// A write-back that did not complete. Never surfaced to request callers.
#[derive(Debug, Clone, Serialize)]
pub struct PersistenceWarning {
    pub interaction_id: InteractionId,
    pub stage: WriteStage,
    pub reason: String,
    pub at: DateTime<Utc>,
}

enum Command {
    Write(Box<PersistenceJob>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

pub struct PersistenceQueue {
    tx: mpsc::Sender<Command>,
    warnings_tx: mpsc::Sender<PersistenceWarning>,
    warnings_rx: Mutex<mpsc::Receiver<PersistenceWarning>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl PersistenceQueue {
    /// Spawns the worker. Must be called inside a tokio runtime.
    pub fn start(port: Arc<dyn PersistencePort>) -> Self {
        Self::with_capacity(port, DEFAULT_PERSISTENCE_QUEUE_CAPACITY)
    }

    pub fn with_capacity(port: Arc<dyn PersistencePort>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (warnings_tx, warnings_rx) = mpsc::channel(WARNING_CHANNEL_CAPACITY);
        let worker = tokio::spawn(run_worker(port, rx, warnings_tx.clone()));
        info!(capacity, "Persistence queue started");
        Self {
            tx,
            warnings_tx,
            warnings_rx: Mutex::new(warnings_rx),
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queues a job without waiting. Returns `false` if it was dropped
    /// because the queue is full or shut down.
    pub fn enqueue(&self, job: PersistenceJob) -> bool {
        let interaction_id = job.interaction.id();
        match self.tx.try_send(Command::Write(Box::new(job))) {
            Ok(()) => {
                debug!(%interaction_id, "Persistence job queued");
                true
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "queue closed",
                };
                warn!(%interaction_id, reason, "Persistence job dropped");
                publish(
                    &self.warnings_tx,
                    PersistenceWarning {
                        interaction_id,
                        stage: WriteStage::Enqueue,
                        reason: reason.to_string(),
                        at: Utc::now(),
                    },
                );
                false
            }
        }
    }

    /// Waits until every job queued before this call has been processed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Drains pending warnings.
    pub fn take_warnings(&self) -> Vec<PersistenceWarning> {
        let mut rx = self.warnings_rx.lock();
        let mut out = Vec::new();
        while let Ok(w) = rx.try_recv() {
            out.push(w);
        }
        out
    }

    pub fn dropped_jobs(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Processes everything already queued, then stops the worker. Idempotent.
    pub async fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if self.tx.send(Command::Shutdown).await.is_err() {
            debug!("Persistence worker already stopped");
        }
        if let Err(e) = worker.await {
            error!(error = %e, "Persistence worker panicked");
        }
        info!("Persistence queue stopped");
    }
}

impl std::fmt::Debug for PersistenceQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceQueue")
            .field("capacity", &self.tx.max_capacity())
            .field("dropped", &self.dropped_jobs())
            .finish()
    }
}

fn publish(tx: &mpsc::Sender<PersistenceWarning>, warning: PersistenceWarning) {
    if tx.try_send(warning).is_err() {
        debug!("Warning channel full; warning only logged");
    }
}

async fn run_worker(
    port: Arc<dyn PersistencePort>,
    mut rx: mpsc::Receiver<Command>,
    warnings: mpsc::Sender<PersistenceWarning>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write(job) => write_job(port.as_ref(), *job, &warnings).await,
            Command::Flush(done) => {
                let _ = done.send(());
            }
            Command::Shutdown => break,
        }
    }
}

async fn write_job(
    port: &dyn PersistencePort,
    job: PersistenceJob,
    warnings: &mpsc::Sender<PersistenceWarning>,
) {
    let local_id = job.interaction.id();
    let warn_at = |stage: WriteStage, reason: String| {
        error!(interaction_id = %local_id, ?stage, %reason, "Persistence write failed");
        publish(
            warnings,
            PersistenceWarning {
                interaction_id: local_id,
                stage,
                reason,
                at: Utc::now(),
            },
        );
    };

    let stored_id = match port.save_generation_interaction(&job.interaction).await {
        Ok(id) => id,
        Err(e) => {
            // Without a stored interaction the POIs cannot be linked.
            warn_at(WriteStage::Interaction, e.to_string());
            return;
        }
    };

    if job.pois.is_empty() {
        debug!(interaction_id = %stored_id, "Interaction persisted");
        return;
    }

    match port
        .save_generated_pois(job.user_id.as_deref(), &job.pois, stored_id)
        .await
    {
        Ok(()) => debug!(
            interaction_id = %stored_id,
            pois = job.pois.len(),
            "Generated POIs persisted"
        ),
        Err(e) => warn_at(WriteStage::Pois, e.to_string()),
    }
}
