//! Individual connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use sensbox_core::types::ConnectionId;

/// A message leaving the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Topic.
    pub topic: String,
    /// Body.
    pub payload: Bytes,
}

/// A handle to a single device connection.
///
/// Holds the sender side of the channel the transport drains to write
/// packets to the device.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Engine-assigned connection id
    pub id: ConnectionId,
    /// Sender for outbound packets
    sender: mpsc::Sender<OutboundPacket>,
    /// When the connection was registered
    pub connected_at: DateTime<Utc>,
    /// Whether the transport is still draining the channel
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(id: ConnectionId, sender: mpsc::Sender<OutboundPacket>) -> Self {
        Self {
            id,
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue a packet for the device. Never waits on a slow consumer.
    pub fn send(&self, packet: OutboundPacket) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(packet) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping packet");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
