//! Per-processing-id mutual exclusion.
//!
//! The intake sequence `find → decide → submit → record` is not atomic at
//! the store. A lock per processing id, held across the whole sequence,
//! keeps two concurrent requests for the same id from both reaching the
//! ledger. Entries are removed when the last holder or waiter is gone, so
//! the map only grows with the number of ids currently in flight.

use std::sync::Arc;

use anchor_core::ProcessingId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<()>>;

/// Map of async locks keyed by processing id.
#[derive(Debug, Clone, Default)]
pub struct ProcessingLocks {
    slots: Arc<DashMap<String, Slot>>,
}

impl ProcessingLocks {
    /// An empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn acquire(&self, id: &ProcessingId) -> ProcessingGuard {
        let slot = Arc::clone(&self.slots.entry(id.as_str().to_string()).or_default());
        let guard = slot.lock_owned().await;
        ProcessingGuard {
            key: id.as_str().to_string(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of ids with a holder or waiter.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive hold on one processing id.
#[derive(Debug)]
pub struct ProcessingGuard {
    key: String,
    slots: Arc<DashMap<String, Slot>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts.
        drop(self.guard.take());
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
