//! Per-key request coalescing for the fallback path.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::hashing::CacheKey;

type Slot = Arc<AsyncMutex<()>>;

/// At most one holder per key; later callers wait for the holder to finish.
#[derive(Debug, Default)]
pub struct FlightGroup {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: CacheKey) -> FlightGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            prune_idle(&mut slots);
            Arc::clone(slots.entry(key).or_default())
        };
        let permit = Arc::clone(&slot).lock_owned().await;
        FlightGuard {
            group: self,
            key,
            slot,
            permit: Some(permit),
        }
    }

    /// Keys with a holder or waiters.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }
}

pub struct FlightGuard<'a> {
    group: &'a FlightGroup,
    key: CacheKey,
    slot: Slot,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Release before inspecting the count so a waiter can proceed.
        drop(self.permit.take());
        let mut slots = self.group.slots.lock();
        if let Some(existing) = slots.get(&self.key)
            && Arc::ptr_eq(existing, &self.slot)
            // Only the map and this guard reference the slot: nobody is waiting.
            && Arc::strong_count(&self.slot) <= 2
        {
            slots.remove(&self.key);
        }
        prune_idle(&mut slots);
    }
}

/// Drops slots only the map still references. A waiter cancelled while the
/// holder was releasing leaves one of these behind.
fn prune_idle(slots: &mut HashMap<CacheKey, Slot>) {
    slots.retain(|_, slot| Arc::strong_count(slot) > 1);
}
