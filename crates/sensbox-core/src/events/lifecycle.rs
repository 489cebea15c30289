//! Presence lifecycle events and the configuration envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::DeviceIdentity;

use super::{TOPIC_CONFIGURATION, TOPIC_CONNECTED, TOPIC_DISCONNECTED};

/// A presence transition announced to the whole fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A device was identified on a connection.
    Connected {
        /// Device UUID.
        uuid: String,
        /// Hostname reported by the directory.
        hostname: String,
        /// Connected flag as stored by the directory.
        connected: bool,
    },
    /// An identified connection closed.
    Disconnected {
        /// Device UUID.
        uuid: String,
    },
}

#[derive(Serialize)]
struct Envelope<A> {
    agent: A,
}

#[derive(Serialize)]
struct ConnectedAgent<'a> {
    uuid: &'a str,
    hostname: &'a str,
    connected: bool,
}

#[derive(Serialize)]
struct AgentRef<'a> {
    uuid: &'a str,
}

impl LifecycleEvent {
    /// Build the connect event from the directory's canonical identity.
    pub fn connected(identity: &DeviceIdentity) -> Self {
        Self::Connected {
            uuid: identity.uuid.clone(),
            hostname: identity.hostname.clone(),
            connected: identity.connected,
        }
    }

    /// Topic the event is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Connected { .. } => TOPIC_CONNECTED,
            Self::Disconnected { .. } => TOPIC_DISCONNECTED,
        }
    }

    /// Device UUID the event refers to.
    pub fn uuid(&self) -> &str {
        match self {
            Self::Connected { uuid, .. } | Self::Disconnected { uuid } => uuid,
        }
    }

    /// Serialize to the `{"agent": {...}}` wire body.
    pub fn to_payload(&self) -> AppResult<Bytes> {
        let json = match self {
            Self::Connected {
                uuid,
                hostname,
                connected,
            } => serde_json::to_vec(&Envelope {
                agent: ConnectedAgent {
                    uuid,
                    hostname,
                    connected: *connected,
                },
            })?,
            Self::Disconnected { uuid } => serde_json::to_vec(&Envelope {
                agent: AgentRef { uuid },
            })?,
        };
        Ok(Bytes::from(json))
    }
}

/// Configuration update unicast to a single device connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMessage {
    /// Target device.
    pub agent: ConfigurationTarget,
    /// Opaque configuration body.
    pub configurations: serde_json::Value,
}

/// Device reference inside [`ConfigurationMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationTarget {
    /// Device UUID.
    pub uuid: String,
}

impl ConfigurationMessage {
    /// Wrap a configuration body for a device.
    pub fn new(uuid: impl Into<String>, configurations: serde_json::Value) -> Self {
        Self {
            agent: ConfigurationTarget { uuid: uuid.into() },
            configurations,
        }
    }

    /// Topic the message is published on.
    pub fn topic(&self) -> &'static str {
        TOPIC_CONFIGURATION
    }

    /// Serialize to the wire body.
    pub fn to_payload(&self) -> AppResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
