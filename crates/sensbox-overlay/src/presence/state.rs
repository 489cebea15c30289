//! Per-connection identity state.

use serde::{Deserialize, Serialize};

use sensbox_core::types::DeviceSession;

/// Identity state of one connection: `New -> Identified -> Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Open, no device identified yet.
    New,
    /// A device was identified and announced.
    Identified(DeviceSession),
    /// Disconnect processed. Terminal.
    Closed,
}

impl ConnectionState {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Identified(_) => "identified",
            Self::Closed => "closed",
        }
    }

    /// The identified session, if any.
    pub fn session(&self) -> Option<&DeviceSession> {
        match self {
            Self::Identified(session) => Some(session),
            Self::New | Self::Closed => None,
        }
    }
}
