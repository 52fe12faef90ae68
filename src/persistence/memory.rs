use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{PersistenceError, PersistenceResult};
use super::file::StoredPoi;
use super::{PersistencePort, check_pois};
use crate::generation::{GenerationInteraction, InteractionId};
use crate::poi::Poi;

/// In-memory store with failure injection.
#[derive(Default)]
pub struct InMemoryPersistence {
    interactions: Mutex<Vec<GenerationInteraction>>,
    pois: Mutex<Vec<StoredPoi>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn interactions(&self) -> Vec<GenerationInteraction> {
        self.interactions.lock().clone()
    }

    pub fn pois(&self) -> Vec<StoredPoi> {
        self.pois.lock().clone()
    }

    async fn gate(&self) -> PersistenceResult<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable {
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn save_generation_interaction(
        &self,
        record: &GenerationInteraction,
    ) -> PersistenceResult<InteractionId> {
        self.gate().await?;
        self.interactions.lock().push(record.clone());
        Ok(record.id())
    }

    async fn save_generated_pois(
        &self,
        user_id: Option<&str>,
        pois: &[Poi],
        interaction_id: InteractionId,
    ) -> PersistenceResult<()> {
        self.gate().await?;
        check_pois(pois)?;
        self.pois.lock().extend(pois.iter().map(|poi| StoredPoi {
            interaction_id,
            user_id: user_id.map(str::to_string),
            poi: poi.clone(),
        }));
        Ok(())
    }
}
