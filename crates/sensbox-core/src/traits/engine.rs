//! Publish side of the messaging engine contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::ConnectionId;

/// The operations the overlay needs from the pub/sub engine.
///
/// The event side (authenticate, connect, disconnect, publish) is driven by
/// the engine calling into the overlay's hook methods.
#[async_trait]
pub trait MessagingEngine: Send + Sync + std::fmt::Debug + 'static {
    /// Publish to every subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: Bytes) -> AppResult<()>;

    /// Publish to a single connection. Returns `false` when the connection
    /// is not live on this engine.
    async fn publish_to(
        &self,
        connection_id: &ConnectionId,
        topic: &str,
        payload: Bytes,
    ) -> AppResult<bool>;

    /// Whether the connection is currently open on this engine.
    fn is_connected(&self, connection_id: &ConnectionId) -> bool;
}
