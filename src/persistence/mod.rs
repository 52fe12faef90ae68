//! Durable write-back of generated POIs and fallback interaction records.
//!
//! Writes go through [`PersistenceQueue`], a background worker with its own
//! warning channel. Nothing here is on the request path: a failed write is a
//! [`PersistenceWarning`], never an error returned to the caller.

mod error;
mod file;
#[cfg(any(test, feature = "mock"))]
mod memory;
mod queue;


use async_trait::async_trait;

use crate::generation::{GenerationInteraction, InteractionId};
use crate::poi::Poi;

pub use error::{PersistenceError, PersistenceResult};
pub use file::{FilePersistence, StoredPoi};
#[cfg(any(test, feature = "mock"))]
pub use memory::InMemoryPersistence;
pub use queue::{PersistenceJob, PersistenceQueue, PersistenceWarning, WriteStage};

#[async_trait]
/// Durable store for fallback output.
pub trait PersistencePort: Send + Sync {
    async fn save_generation_interaction(
        &self,
        record: &GenerationInteraction,
    ) -> PersistenceResult<InteractionId>;

    async fn save_generated_pois(
        &self,
        user_id: Option<&str>,
        pois: &[Poi],
        interaction_id: InteractionId,
    ) -> PersistenceResult<()>;
}

/// Rejects rows that break the write invariants (name, coordinate range).
pub(crate) fn check_pois(pois: &[Poi]) -> PersistenceResult<()> {
    for poi in pois {
        poi.validate()
            .map_err(|e| PersistenceError::InvalidRecord {
                reason: format!("{}: {e}", poi.id),
            })?;
    }
    Ok(())
}
