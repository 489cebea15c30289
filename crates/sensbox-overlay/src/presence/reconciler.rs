//! Presence reconciler: drives each connection through
//! `New -> Identified -> Closed` and announces the transitions.
//!
//! Every transition of a connection runs under its slot lock, so a
//! connection announces at most one connect and, only after that, at most
//! one disconnect. Registry and engine failures are logged and skipped;
//! only a failed directory lookup fails an identification.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sensbox_core::error::AppError;
use sensbox_core::events::LifecycleEvent;
use sensbox_core::result::AppResult;
use sensbox_core::traits::{DirectoryService, MessagingEngine};
use sensbox_core::types::{ConnectionId, DeviceSession};
use sensbox_registry::{ConnectionRegistry, RegistryEntry};

use super::slots::SlotTable;
use super::state::ConnectionState;
use crate::metrics::OverlayMetrics;

/// Result of an identification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifyOutcome {
    /// The device was identified and `agent/connected` announced.
    Identified(DeviceSession),
    /// The connection already carries an identified device; nothing announced.
    AlreadyIdentified,
    /// The connection is closed; nothing done.
    Closed,
}

/// Per-connection presence state machine.
#[derive(Debug)]
pub struct PresenceReconciler {
    registry: ConnectionRegistry,
    directory: Arc<dyn DirectoryService>,
    engine: Arc<dyn MessagingEngine>,
    slots: SlotTable,
    metrics: Arc<OverlayMetrics>,
}

impl PresenceReconciler {
    /// Create a reconciler.
    pub fn new(
        registry: ConnectionRegistry,
        directory: Arc<dyn DirectoryService>,
        engine: Arc<dyn MessagingEngine>,
        metrics: Arc<OverlayMetrics>,
    ) -> Self {
        Self {
            registry,
            directory,
            engine,
            slots: SlotTable::new(),
            metrics,
        }
    }

    /// Connection registry backing the reconciler.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Start tracking an accepted connection and record it as unidentified.
    pub async fn connect(&self, id: &ConnectionId) {
        let (_slot, replaced) = self.slots.open(id).await;
        if replaced.is_some() {
            warn!(conn_id = %id, "Connection id reused while still tracked, replacing its state");
        }
        OverlayMetrics::incr(&self.metrics.connections_opened);

        if let Err(e) = self.registry.put(id, None).await {
            self.store_failed(id, "record connection", &e);
        }
        debug!(conn_id = %id, "Connection opened");
    }

    /// Identify the device behind a connection from its first message.
    ///
    /// Only a `New` connection whose registry row is not already identified
    /// gets looked up and announced. An identified connection has its row
    /// rewritten, restarting the row's lifetime. Returns an error only when the
    /// Directory Service lookup fails; the connection then stays `New` and
    /// the next message retries.
    pub async fn identify(&self, id: &ConnectionId, uuid: &str) -> AppResult<IdentifyOutcome> {
        let slot = match self.slots.get(id) {
            Some(slot) => slot,
            // Connected before this process took over the registry.
            None if self.engine.is_connected(id) => self.slots.get_or_open(id),
            None => {
                debug!(conn_id = %id, "Message on closed connection, not identifying");
                return Ok(IdentifyOutcome::Closed);
            }
        };
        let mut state = slot.lock().await;

        match &*state {
            ConnectionState::Identified(session) => {
                self.refresh(id, session).await;
                return Ok(IdentifyOutcome::AlreadyIdentified);
            }
            ConnectionState::Closed => return Ok(IdentifyOutcome::Closed),
            ConnectionState::New => {}
        }

        match self.registry.get(id).await {
            Ok(RegistryEntry::Identified(session)) => {
                debug!(conn_id = %id, uuid = %session.device_uuid, "Adopting identified session from registry");
                self.refresh(id, &session).await;
                *state = ConnectionState::Identified(session);
                return Ok(IdentifyOutcome::AlreadyIdentified);
            }
            Ok(RegistryEntry::Pending | RegistryEntry::Absent) => {}
            Err(e) => self.store_failed(id, "read connection", &e),
        }

        let identity = match self.directory.connect_device(uuid).await {
            Ok(identity) => identity,
            Err(e) => {
                OverlayMetrics::incr(&self.metrics.identify_failures);
                warn!(conn_id = %id, uuid, error = %e, "Device identification failed");
                return Err(e);
            }
        };

        let session = DeviceSession::from_identity(id.clone(), &identity);
        if let Err(e) = self.registry.put(id, Some(&session)).await {
            self.store_failed(id, "cache session", &e);
        }
        *state = ConnectionState::Identified(session.clone());

        info!(
            conn_id = %id,
            uuid = %identity.uuid,
            hostname = %identity.hostname,
            "Device connected"
        );
        OverlayMetrics::incr(&self.metrics.devices_identified);
        self.announce(id, LifecycleEvent::connected(&identity)).await;

        Ok(IdentifyOutcome::Identified(session))
    }

    /// Close a connection.
    ///
    /// Announces `agent/disconnected` and notifies the Directory Service
    /// only if a device was identified on the connection. Returns that
    /// device's session.
    pub async fn disconnect(&self, id: &ConnectionId) -> Option<DeviceSession> {
        let previous = match self.slots.remove(id) {
            Some(slot) => {
                let mut state = slot.lock().await;
                std::mem::replace(&mut *state, ConnectionState::Closed)
            }
            None => ConnectionState::New,
        };

        let session = match previous {
            ConnectionState::Closed => return None,
            ConnectionState::Identified(session) => Some(session),
            ConnectionState::New => match self.registry.get(id).await {
                Ok(entry) => entry.into_session(),
                Err(e) => {
                    self.store_failed(id, "read connection", &e);
                    None
                }
            },
        };
        OverlayMetrics::incr(&self.metrics.connections_closed);

        if let Err(e) = self.registry.delete(id).await {
            self.store_failed(id, "remove connection", &e);
        }

        let Some(session) = session else {
            debug!(conn_id = %id, "Connection closed before identification");
            return None;
        };

        info!(conn_id = %id, uuid = %session.device_uuid, "Device disconnected");
        OverlayMetrics::incr(&self.metrics.devices_disconnected);
        self.announce(
            id,
            LifecycleEvent::Disconnected {
                uuid: session.device_uuid.clone(),
            },
        )
        .await;

        if let Err(e) = self.directory.disconnect_device(&session.device_uuid).await {
            warn!(
                conn_id = %id,
                uuid = %session.device_uuid,
                error = %e,
                "Directory disconnect failed"
            );
        }

        Some(session)
    }

    /// Current state of a tracked connection.
    pub async fn state(&self, id: &ConnectionId) -> Option<ConnectionState> {
        let slot = self.slots.get(id)?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Number of tracked connections.
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }

    async fn announce(&self, id: &ConnectionId, event: LifecycleEvent) {
        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(conn_id = %id, topic = event.topic(), error = %e, "Failed to encode lifecycle event");
                return;
            }
        };
        if let Err(e) = self.engine.publish(event.topic(), payload).await {
            warn!(
                conn_id = %id,
                topic = event.topic(),
                uuid = event.uuid(),
                error = %e,
                "Failed to publish lifecycle event"
            );
        }
    }

    /// Rewrite an identified row so it outlives the registry TTL while the
    /// device keeps sending.
    async fn refresh(&self, id: &ConnectionId, session: &DeviceSession) {
        if let Err(e) = self.registry.put(id, Some(session)).await {
            self.store_failed(id, "refresh session", &e);
        }
    }

    fn store_failed(&self, id: &ConnectionId, operation: &str, error: &AppError) {
        OverlayMetrics::incr(&self.metrics.store_failures);
        warn!(conn_id = %id, operation, error = %error, "Registry unavailable, continuing");
    }
}
