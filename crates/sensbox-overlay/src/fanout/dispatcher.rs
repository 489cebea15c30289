//! Delivery of one configuration record.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sensbox_core::events::ConfigurationMessage;
use sensbox_core::traits::MessagingEngine;
use sensbox_core::types::ConfigurationEvent;
use sensbox_registry::ConnectionRegistry;

use crate::metrics::OverlayMetrics;

/// Resolves the connections of a device and unicasts configuration to them.
#[derive(Debug, Clone)]
pub struct ConfigurationFanout {
    registry: ConnectionRegistry,
    engine: Arc<dyn MessagingEngine>,
    metrics: Arc<OverlayMetrics>,
}

impl ConfigurationFanout {
    /// Create a fan-out over the shared registry and engine.
    pub fn new(
        registry: ConnectionRegistry,
        engine: Arc<dyn MessagingEngine>,
        metrics: Arc<OverlayMetrics>,
    ) -> Self {
        Self {
            registry,
            engine,
            metrics,
        }
    }

    /// Deliver one record. Returns the number of connections reached.
    ///
    /// Only connections whose cached session names the target device and
    /// that are live on this engine receive it. Nothing is queued for
    /// devices that are not connected.
    pub async fn dispatch(&self, event: &ConfigurationEvent) -> usize {
        let uuid = event.target_device_uuid.as_str();

        let candidates = match self.registry.reverse_lookup(uuid).await {
            Ok(candidates) => candidates,
            Err(e) => {
                OverlayMetrics::incr(&self.metrics.store_failures);
                warn!(uuid, seq = %event.sequence_id, error = %e, "Reverse lookup failed, dropping configuration");
                return 0;
            }
        };

        let message = ConfigurationMessage::new(uuid, event.configuration_payload.clone());
        let payload = match message.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(uuid, seq = %event.sequence_id, error = %e, "Failed to encode configuration");
                return 0;
            }
        };

        let mut delivered = 0;
        for connection_id in candidates {
            if !self.engine.is_connected(&connection_id) {
                debug!(conn_id = %connection_id, uuid, "Skipping connection not live on this node");
                continue;
            }
            match self
                .engine
                .publish_to(&connection_id, message.topic(), payload.clone())
                .await
            {
                Ok(true) => {
                    delivered += 1;
                    OverlayMetrics::incr(&self.metrics.configurations_delivered);
                    info!(conn_id = %connection_id, uuid, seq = %event.sequence_id, "Configuration delivered");
                }
                Ok(false) => {
                    debug!(conn_id = %connection_id, uuid, "Connection went away before delivery");
                }
                Err(e) => {
                    warn!(conn_id = %connection_id, uuid, error = %e, "Configuration delivery failed");
                }
            }
        }

        if delivered == 0 {
            OverlayMetrics::incr(&self.metrics.configurations_unmatched);
            debug!(uuid, seq = %event.sequence_id, "No live connection for configuration");
        }
        delivered
    }
}
