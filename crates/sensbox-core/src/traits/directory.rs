//! Directory and Processing Service RPC surfaces.

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::{DeviceIdentity, PayloadReceipt};

/// A decoded credential. `None` means the client presented no buffer at all,
/// which is distinct from an empty string.
pub type Credential = Option<String>;

/// System of record for device identity and authorization.
#[async_trait]
pub trait DirectoryService: Send + Sync + std::fmt::Debug + 'static {
    /// Check connect-time credentials. Any error means "not authorized".
    async fn authorize_client(&self, username: Credential, password: Credential) -> AppResult<()>;

    /// Mark a device connected and return its canonical identity.
    async fn connect_device(&self, uuid: &str) -> AppResult<DeviceIdentity>;

    /// Mark a device disconnected and return its canonical identity.
    async fn disconnect_device(&self, uuid: &str) -> AppResult<DeviceIdentity>;
}

/// Durable storage and interpretation of device telemetry.
#[async_trait]
pub trait ProcessingService: Send + Sync + std::fmt::Debug + 'static {
    /// Hand over one parsed application payload.
    async fn handle_payload(&self, payload: &Value) -> AppResult<PayloadReceipt>;
}
