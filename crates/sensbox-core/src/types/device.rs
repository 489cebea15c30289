//! Device identity as owned by the Directory Service, and the session the
//! overlay caches per connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ConnectionId;

/// Authoritative device record returned by the Directory Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Stable device UUID.
    pub uuid: String,
    /// Hostname the device registered with.
    #[serde(default)]
    pub hostname: String,
    /// Whether the directory considers the device connected.
    #[serde(default)]
    pub connected: bool,
    /// Whether the device is enabled in the directory.
    #[serde(default)]
    pub active: bool,
}

/// Identified session cached in the connection registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    /// Connection the device was identified on.
    pub connection_id: ConnectionId,
    /// Device UUID.
    pub device_uuid: String,
    /// Hostname cached from the directory.
    pub hostname: String,
    /// When identification completed.
    pub connected_at: DateTime<Utc>,
}

impl DeviceSession {
    /// Build a session from the canonical identity returned on connect.
    pub fn from_identity(connection_id: ConnectionId, identity: &DeviceIdentity) -> Self {
        Self {
            connection_id,
            device_uuid: identity.uuid.clone(),
            hostname: identity.hostname.clone(),
            connected_at: Utc::now(),
        }
    }
}

/// Device reference inside service responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Device UUID.
    pub uuid: String,
}

/// Outcome of handing a payload to the Processing Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadReceipt {
    /// Device the payload was attributed to.
    pub device: DeviceRef,
    /// Number of records stored.
    #[serde(default)]
    pub stored: u64,
}
