//! Registry key builders.

use sensbox_core::types::ConnectionId;

/// Prefix shared by every connection row.
pub const CONNECTION_PREFIX: &str = "conn:";

/// Key of the row for a connection.
pub fn connection(id: &ConnectionId) -> String {
    format!("{CONNECTION_PREFIX}{id}")
}

/// Recover the connection id from a row key.
pub fn connection_id(key: &str) -> Option<ConnectionId> {
    key.strip_prefix(CONNECTION_PREFIX)
        .filter(|id| !id.is_empty())
        .map(ConnectionId::from)
}
