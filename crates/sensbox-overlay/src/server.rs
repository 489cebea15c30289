//! Top-level overlay that ties the subsystems together and exposes the
//! hooks a messaging engine drives.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sensbox_core::traits::{ChangeFeed, DirectoryService, MessagingEngine, ProcessingService};
use sensbox_core::types::{ConnectionId, DeviceSession};
use sensbox_registry::ConnectionRegistry;

use crate::auth::{AuthBridge, AuthDecision};
use crate::fanout::ConfigurationFanout;
use crate::metrics::OverlayMetrics;
use crate::presence::PresenceReconciler;
use crate::router::{MessageRouter, RouteOutcome};

/// Identity-aware overlay over a messaging engine.
///
/// Transports call [`Overlay::authenticate`] before accepting a device,
/// [`Overlay::on_connect`] once it is accepted, [`Overlay::on_publish`] for
/// every inbound publish and [`Overlay::on_disconnect`] after the engine has
/// dropped the connection.
#[derive(Clone)]
pub struct Overlay {
    /// Connect-time credential check.
    pub auth: Arc<AuthBridge>,
    /// Presence state machine.
    pub presence: Arc<PresenceReconciler>,
    /// Publish routing.
    pub router: Arc<MessageRouter>,
    /// Configuration unicast.
    pub fanout: Arc<ConfigurationFanout>,
    /// Counters.
    pub metrics: Arc<OverlayMetrics>,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("tracked", &self.presence.tracked())
            .finish()
    }
}

impl Overlay {
    /// Wire the overlay over its collaborators.
    pub fn new(
        registry: ConnectionRegistry,
        directory: Arc<dyn DirectoryService>,
        processing: Arc<dyn ProcessingService>,
        engine: Arc<dyn MessagingEngine>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        let metrics = Arc::new(OverlayMetrics::new());
        let auth = Arc::new(AuthBridge::new(directory.clone(), metrics.clone()));
        let presence = Arc::new(PresenceReconciler::new(
            registry.clone(),
            directory,
            engine.clone(),
            metrics.clone(),
        ));
        let router = Arc::new(MessageRouter::new(
            presence.clone(),
            processing,
            metrics.clone(),
        ));
        let fanout = Arc::new(ConfigurationFanout::new(registry, engine, metrics.clone()));

        info!("Overlay initialized");

        Self {
            auth,
            presence,
            router,
            fanout,
            metrics,
            shutdown_tx,
        }
    }

    /// Check the credentials of a connecting client.
    pub async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        username: Option<&[u8]>,
        password: Option<&[u8]>,
    ) -> AuthDecision {
        self.auth.authenticate(connection_id, username, password).await
    }

    /// A client was accepted.
    pub async fn on_connect(&self, connection_id: &ConnectionId) {
        self.presence.connect(connection_id).await;
    }

    /// A client connection closed.
    pub async fn on_disconnect(&self, connection_id: &ConnectionId) -> Option<DeviceSession> {
        self.presence.disconnect(connection_id).await
    }

    /// A client published a message.
    pub async fn on_publish(
        &self,
        connection_id: &ConnectionId,
        topic: &str,
        payload: &[u8],
    ) -> RouteOutcome {
        self.router.route(connection_id, topic, payload).await
    }

    /// Start the configuration fan-out on a background task.
    pub fn spawn_fanout(&self, feed: Arc<dyn ChangeFeed>) -> JoinHandle<()> {
        let fanout = self.fanout.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = fanout.run(feed, shutdown).await {
                warn!(error = %e, "Configuration fan-out not running");
            }
        })
    }

    /// Stop background work and wait for in-flight forwards.
    pub async fn shutdown(&self) {
        info!("Shutting down overlay");
        self.shutdown_tx.send_replace(true);
        self.router.flush().await;
        info!("Overlay shut down");
    }
}
