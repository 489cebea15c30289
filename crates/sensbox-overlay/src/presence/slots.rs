//! Keyed table of per-connection state slots.
//!
//! Each slot is an async mutex; every transition of a connection happens
//! while holding its slot, so hooks for one connection run one at a time
//! while different connections proceed independently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use sensbox_core::types::ConnectionId;

use super::state::ConnectionState;

/// Shared slot of one connection.
pub type Slot = Arc<Mutex<ConnectionState>>;

/// Connection id -> state slot.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: DashMap<ConnectionId, Slot>,
}

impl SlotTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh `New` slot and return it already locked, along with
    /// any slot it replaced under the same id.
    ///
    /// The slot is locked before it becomes visible, so no other hook can
    /// observe it until the caller releases the guard.
    pub async fn open(&self, id: &ConnectionId) -> (OwnedMutexGuard<ConnectionState>, Option<Slot>) {
        let slot: Slot = Arc::new(Mutex::new(ConnectionState::New));
        let guard = slot.clone().lock_owned().await;
        let replaced = self.slots.insert(id.clone(), slot);
        (guard, replaced)
    }

    /// Slot of a connection, if tracked.
    pub fn get(&self, id: &ConnectionId) -> Option<Slot> {
        self.slots.get(id).map(|entry| entry.value().clone())
    }

    /// Slot of a connection, creating a `New` one if untracked.
    pub fn get_or_open(&self, id: &ConnectionId) -> Slot {
        self.slots
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ConnectionState::New)))
            .value()
            .clone()
    }

    /// Stop tracking a connection, returning its slot.
    pub fn remove(&self, id: &ConnectionId) -> Option<Slot> {
        self.slots.remove(id).map(|(_, slot)| slot)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no connection is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
