//! Connection registry: connection id -> cached device session.
//!
//! Row encoding: an open but unidentified connection is stored as JSON
//! `null`; an identified one as the serialized [`DeviceSession`]. A missing
//! row means the connection was never seen (or was already cleared).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sensbox_core::error::{AppError, ErrorKind};
use sensbox_core::result::AppResult;
use sensbox_core::traits::KeyValueStore;
use sensbox_core::types::{ConnectionId, DeviceSession};

use crate::keys;

/// State of one registry row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    /// No row for the connection.
    Absent,
    /// Connection open, device not identified yet.
    Pending,
    /// Device identified on the connection.
    Identified(DeviceSession),
}

impl RegistryEntry {
    /// The cached session, if identified.
    pub fn session(&self) -> Option<&DeviceSession> {
        match self {
            Self::Identified(session) => Some(session),
            Self::Absent | Self::Pending => None,
        }
    }

    /// Consume the entry, returning the cached session if identified.
    pub fn into_session(self) -> Option<DeviceSession> {
        match self {
            Self::Identified(session) => Some(session),
            Self::Absent | Self::Pending => None,
        }
    }
}

/// Typed view over the key-value backend.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ConnectionRegistry {
    /// Create a registry over a backend with the given row lifetime.
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Write a row. `None` marks the connection open but unidentified.
    pub async fn put(&self, id: &ConnectionId, session: Option<&DeviceSession>) -> AppResult<()> {
        let value = serde_json::to_string(&session)?;
        self.store.set(&keys::connection(id), &value, self.ttl).await
    }

    /// Read a row.
    pub async fn get(&self, id: &ConnectionId) -> AppResult<RegistryEntry> {
        match self.store.get(&keys::connection(id)).await? {
            None => Ok(RegistryEntry::Absent),
            Some(raw) => decode(&raw),
        }
    }

    /// Remove a row.
    pub async fn delete(&self, id: &ConnectionId) -> AppResult<()> {
        self.store.delete(&keys::connection(id)).await
    }

    /// Every connection whose cached session belongs to `uuid`.
    ///
    /// Scans all connection rows, one read per row. Intended for the
    /// configuration fan-out path, not for per-message use.
    pub async fn reverse_lookup(&self, uuid: &str) -> AppResult<HashSet<ConnectionId>> {
        let mut matches = HashSet::new();
        let row_keys = self.store.keys(keys::CONNECTION_PREFIX).await?;
        let scanned = row_keys.len();

        for key in row_keys {
            let Some(id) = keys::connection_id(&key) else {
                continue;
            };
            let raw = match self.store.get(&key).await? {
                Some(raw) => raw,
                None => continue,
            };
            match decode(&raw) {
                Ok(RegistryEntry::Identified(session)) if session.device_uuid == uuid => {
                    matches.insert(id);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(connection_id = %id, error = %e, "Skipping undecodable registry row");
                }
            }
        }

        debug!(uuid, scanned, matched = matches.len(), "Reverse lookup");
        Ok(matches)
    }

    /// Check that the backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }
}

fn decode(raw: &str) -> AppResult<RegistryEntry> {
    if raw.is_empty() {
        return Ok(RegistryEntry::Pending);
    }
    let session: Option<DeviceSession> = serde_json::from_str(raw).map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, "Corrupt registry row", e)
    })?;
    Ok(match session {
        Some(session) => RegistryEntry::Identified(session),
        None => RegistryEntry::Pending,
    })
}
