//! Engine implementation backed by in-process channels.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use sensbox_core::result::AppResult;
use sensbox_core::traits::MessagingEngine;
use sensbox_core::types::ConnectionId;

use super::handle::{ConnectionHandle, OutboundPacket};

/// Tracks live connections and fans packets out to them.
///
/// Broadcast publishes go to every [`LocalEngine::subscribe`] receiver;
/// unicast publishes go to the channel returned by [`LocalEngine::register`].
#[derive(Debug)]
pub struct LocalEngine {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    broadcast_tx: broadcast::Sender<OutboundPacket>,
    buffer_size: usize,
}

impl LocalEngine {
    /// Create an engine with the given per-connection buffer size.
    pub fn new(buffer_size: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(buffer_size.max(1));
        Self {
            connections: DashMap::new(),
            broadcast_tx,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Register an open transport connection.
    ///
    /// Returns the receiver the transport drains to write to the device.
    /// A re-used id replaces the previous handle.
    pub fn register(&self, id: ConnectionId) -> mpsc::Receiver<OutboundPacket> {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(id.clone(), tx));
        if let Some(previous) = self.connections.insert(id.clone(), handle) {
            previous.mark_dead();
        }
        info!(conn_id = %id, "Connection registered with engine");
        rx
    }

    /// Remove a closed transport connection.
    pub fn unregister(&self, id: &ConnectionId) {
        if let Some((_, handle)) = self.connections.remove(id) {
            handle.mark_dead();
            info!(conn_id = %id, "Connection unregistered from engine");
        }
    }

    /// Receive every broadcast publish.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundPacket> {
        self.broadcast_tx.subscribe()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl MessagingEngine for LocalEngine {
    async fn publish(&self, topic: &str, payload: Bytes) -> AppResult<()> {
        let packet = OutboundPacket {
            topic: topic.to_string(),
            payload,
        };
        // Err only means nobody is subscribed right now.
        let receivers = self.broadcast_tx.send(packet).unwrap_or(0);
        debug!(topic, receivers, "Broadcast published");
        Ok(())
    }

    async fn publish_to(
        &self,
        connection_id: &ConnectionId,
        topic: &str,
        payload: Bytes,
    ) -> AppResult<bool> {
        let Some(handle) = self.connections.get(connection_id).map(|h| h.value().clone()) else {
            return Ok(false);
        };
        Ok(handle.send(OutboundPacket {
            topic: topic.to_string(),
            payload,
        }))
    }

    fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.connections
            .get(connection_id)
            .map(|h| h.is_alive())
            .unwrap_or(false)
    }
}
