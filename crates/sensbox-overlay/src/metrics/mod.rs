//! Overlay metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-local counters. Not persisted anywhere.
#[derive(Debug, Default)]
pub struct OverlayMetrics {
    /// Connections opened
    pub connections_opened: AtomicU64,
    /// Connections closed
    pub connections_closed: AtomicU64,
    /// Connect attempts rejected by the auth bridge
    pub auth_rejected: AtomicU64,
    /// Devices identified (connect announcements)
    pub devices_identified: AtomicU64,
    /// Disconnect announcements
    pub devices_disconnected: AtomicU64,
    /// Identification attempts that failed
    pub identify_failures: AtomicU64,
    /// Application messages received
    pub messages_received: AtomicU64,
    /// Application messages handed to the processing service
    pub messages_forwarded: AtomicU64,
    /// Application messages dropped as unparseable
    pub messages_dropped: AtomicU64,
    /// Processing service calls that failed
    pub forward_failures: AtomicU64,
    /// Configuration messages unicast to a connection
    pub configurations_delivered: AtomicU64,
    /// Configuration events with no live target
    pub configurations_unmatched: AtomicU64,
    /// Registry operations skipped because the store failed
    pub store_failures: AtomicU64,
}

impl OverlayMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: load(&self.connections_opened),
            connections_closed: load(&self.connections_closed),
            auth_rejected: load(&self.auth_rejected),
            devices_identified: load(&self.devices_identified),
            devices_disconnected: load(&self.devices_disconnected),
            identify_failures: load(&self.identify_failures),
            messages_received: load(&self.messages_received),
            messages_forwarded: load(&self.messages_forwarded),
            messages_dropped: load(&self.messages_dropped),
            forward_failures: load(&self.forward_failures),
            configurations_delivered: load(&self.configurations_delivered),
            configurations_unmatched: load(&self.configurations_unmatched),
            store_failures: load(&self.store_failures),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections opened
    pub connections_opened: u64,
    /// Connections closed
    pub connections_closed: u64,
    /// Rejected connect attempts
    pub auth_rejected: u64,
    /// Connect announcements
    pub devices_identified: u64,
    /// Disconnect announcements
    pub devices_disconnected: u64,
    /// Failed identifications
    pub identify_failures: u64,
    /// Application messages received
    pub messages_received: u64,
    /// Application messages forwarded
    pub messages_forwarded: u64,
    /// Application messages dropped
    pub messages_dropped: u64,
    /// Failed processing calls
    pub forward_failures: u64,
    /// Configuration unicasts
    pub configurations_delivered: u64,
    /// Configuration events without target
    pub configurations_unmatched: u64,
    /// Skipped registry operations
    pub store_failures: u64,
}
