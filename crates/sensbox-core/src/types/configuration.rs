//! Configuration-intent records delivered by the change feed.

use serde::{Deserialize, Serialize};

/// A configuration update targeted at one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEvent {
    /// Device the configuration is meant for.
    pub target_device_uuid: String,
    /// Opaque configuration body, forwarded untouched.
    pub configuration_payload: serde_json::Value,
    /// Identifier of the record in the feed.
    pub sequence_id: String,
}
