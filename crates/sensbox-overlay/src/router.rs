//! Inbound publish routing.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use sensbox_core::traits::ProcessingService;
use sensbox_core::types::ConnectionId;

use crate::message::{TopicClass, parse_agent_message};
use crate::metrics::OverlayMetrics;
use crate::presence::{IdentifyOutcome, PresenceReconciler};

/// What the router did with one inbound publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A lifecycle announcement; logged only.
    Observed,
    /// Not a topic the overlay handles.
    Ignored,
    /// Unparseable application payload; nothing forwarded.
    Dropped,
    /// Handed to the processing service.
    Forwarded,
}

/// Classifies publishes, identifies devices on first message and forwards
/// telemetry to the processing service.
#[derive(Debug)]
pub struct MessageRouter {
    reconciler: Arc<PresenceReconciler>,
    processing: Arc<dyn ProcessingService>,
    metrics: Arc<OverlayMetrics>,
    tasks: TaskTracker,
}

impl MessageRouter {
    /// Create a router.
    pub fn new(
        reconciler: Arc<PresenceReconciler>,
        processing: Arc<dyn ProcessingService>,
        metrics: Arc<OverlayMetrics>,
    ) -> Self {
        Self {
            reconciler,
            processing,
            metrics,
            tasks: TaskTracker::new(),
        }
    }

    /// Route one publish received from `connection_id`.
    ///
    /// Returns once the message is classified, parsed and the device
    /// identified; forwarding continues in the background.
    pub async fn route(&self, connection_id: &ConnectionId, topic: &str, payload: &[u8]) -> RouteOutcome {
        let class = TopicClass::classify(topic);
        if class.is_announcement() {
            debug!(conn_id = %connection_id, topic, "Lifecycle announcement observed");
            return RouteOutcome::Observed;
        }
        if class != TopicClass::ApplicationMessage {
            return RouteOutcome::Ignored;
        }

        OverlayMetrics::incr(&self.metrics.messages_received);
        let parsed = match parse_agent_message(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                OverlayMetrics::incr(&self.metrics.messages_dropped);
                warn!(conn_id = %connection_id, error = %e, "Dropping unparseable message");
                return RouteOutcome::Dropped;
            }
        };

        // Failures are logged by the reconciler and never block forwarding.
        if let Ok(IdentifyOutcome::Closed) =
            self.reconciler.identify(connection_id, parsed.device_uuid()).await
        {
            debug!(conn_id = %connection_id, "Forwarding message from closed connection");
        }

        self.forward(connection_id.clone(), parsed.raw);
        RouteOutcome::Forwarded
    }

    /// Wait for every in-flight forward to finish.
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    fn forward(&self, connection_id: ConnectionId, payload: Value) {
        let processing = self.processing.clone();
        let metrics = self.metrics.clone();

        self.tasks.spawn(async move {
            match processing.handle_payload(&payload).await {
                Ok(receipt) => {
                    OverlayMetrics::incr(&metrics.messages_forwarded);
                    info!(
                        conn_id = %connection_id,
                        uuid = %receipt.device.uuid,
                        stored = receipt.stored,
                        "Payload processed"
                    );
                }
                Err(e) => {
                    OverlayMetrics::incr(&metrics.forward_failures);
                    warn!(conn_id = %connection_id, error = %e, "Payload processing failed");
                }
            }
        });
    }
}
