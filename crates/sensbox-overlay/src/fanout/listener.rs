//! Change feed consumption loop.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{error, info};

use sensbox_core::result::AppResult;
use sensbox_core::traits::ChangeFeed;

use super::dispatcher::ConfigurationFanout;

impl ConfigurationFanout {
    /// Subscribe to the feed once and deliver records until it ends or
    /// `shutdown` flips to `true`.
    ///
    /// Fails only if the subscription cannot be opened. The feed is not
    /// reopened after it closes.
    pub async fn run(
        &self,
        feed: Arc<dyn ChangeFeed>,
        mut shutdown: watch::Receiver<bool>,
    ) -> AppResult<()> {
        let mut events = feed.subscribe().await.map_err(|e| {
            error!(error = %e, "Configuration feed subscription failed");
            e
        })?;
        info!("Configuration fan-out listening");

        loop {
            tokio::select! {
                next = events.next() => {
                    let Some(event) = next else {
                        info!("Configuration feed ended");
                        break;
                    };
                    self.dispatch(&event).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Configuration fan-out stopping");
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
