//! Connect-time credential check against the Directory Service.

use std::sync::Arc;

use tracing::{info, warn};

use sensbox_core::traits::{Credential, DirectoryService};
use sensbox_core::types::ConnectionId;

use crate::metrics::OverlayMetrics;

/// CONNACK return code sent for every rejection ("bad user name or password").
pub const REJECTION_RETURN_CODE: u8 = 4;

/// Result of a connect-time credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Let the connection in.
    Accept,
    /// Refuse it with a protocol return code.
    Reject {
        /// Code reported to the client.
        return_code: u8,
    },
}

impl AuthDecision {
    /// Whether the connection was accepted.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Decode a credential buffer. A missing buffer stays missing.
pub fn decode_credential(buffer: Option<&[u8]>) -> Credential {
    buffer.map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// Validates connect-time credentials.
///
/// Never touches the connection registry; that happens in the connect hook.
#[derive(Debug, Clone)]
pub struct AuthBridge {
    directory: Arc<dyn DirectoryService>,
    metrics: Arc<OverlayMetrics>,
}

impl AuthBridge {
    /// Create a new auth bridge.
    pub fn new(directory: Arc<dyn DirectoryService>, metrics: Arc<OverlayMetrics>) -> Self {
        Self { directory, metrics }
    }

    /// Check the credentials a connection presented.
    ///
    /// Rejections, timeouts and transport faults all yield the same
    /// [`AuthDecision::Reject`].
    pub async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        username: Option<&[u8]>,
        password: Option<&[u8]>,
    ) -> AuthDecision {
        let username = decode_credential(username);
        let password = decode_credential(password);

        match self.directory.authorize_client(username, password).await {
            Ok(()) => {
                info!(conn_id = %connection_id, "Client authorized");
                AuthDecision::Accept
            }
            Err(e) => {
                warn!(conn_id = %connection_id, error = %e, "Client not authorized");
                OverlayMetrics::incr(&self.metrics.auth_rejected);
                AuthDecision::Reject {
                    return_code: REJECTION_RETURN_CODE,
                }
            }
        }
    }
}
