//! Configuration change feed subscription.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::result::AppResult;
use crate::types::ConfigurationEvent;

/// Stream of newly created configuration records.
pub type ConfigurationStream = BoxStream<'static, ConfigurationEvent>;

/// Server-push subscription to configuration-intent records.
///
/// Records are delivered at most once per subscription; there is no
/// acknowledgment or offset tracking.
#[async_trait]
pub trait ChangeFeed: Send + Sync + std::fmt::Debug + 'static {
    /// Open the subscription. The stream ends when the feed closes.
    async fn subscribe(&self) -> AppResult<ConfigurationStream>;
}
