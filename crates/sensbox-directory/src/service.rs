//! Directory and Processing Service over Cloud Code functions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use sensbox_core::config::directory::DirectoryConfig;
use sensbox_core::result::AppResult;
use sensbox_core::traits::{Credential, DirectoryService, ProcessingService};
use sensbox_core::types::{DeviceIdentity, PayloadReceipt};

use crate::client::CloudClient;

const FN_AUTHORIZE_CLIENT: &str = "mqttAuthorizeClient";
const FN_CONNECT_DEVICE: &str = "mqttConnectDevice";
const FN_DISCONNECT_DEVICE: &str = "mqttDisconnectDevice";
const FN_HANDLE_PAYLOAD: &str = "mqttHandlePayload";

/// Missing credentials serialize as explicit `null`, never as `""`.
#[derive(Debug, Serialize)]
struct AuthorizeParams {
    username: Credential,
    password: Credential,
}

#[derive(Debug, Serialize)]
struct DeviceParams<'a> {
    uuid: &'a str,
}

#[derive(Debug, Serialize)]
struct PayloadParams<'a> {
    payload: &'a Value,
}

#[derive(Debug, Deserialize)]
struct DeviceResult {
    device: DeviceIdentity,
}

/// Cloud Code backed directory.
#[derive(Debug, Clone)]
pub struct CloudDirectory {
    client: CloudClient,
}

impl CloudDirectory {
    /// Create a directory client from configuration.
    pub fn new(config: &DirectoryConfig) -> AppResult<Self> {
        Ok(Self {
            client: CloudClient::new(config)?,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: CloudClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectoryService for CloudDirectory {
    async fn authorize_client(&self, username: Credential, password: Credential) -> AppResult<()> {
        let _: Value = self
            .client
            .run(FN_AUTHORIZE_CLIENT, &AuthorizeParams { username, password })
            .await?;
        Ok(())
    }

    async fn connect_device(&self, uuid: &str) -> AppResult<DeviceIdentity> {
        let result: DeviceResult = self
            .client
            .run(FN_CONNECT_DEVICE, &DeviceParams { uuid })
            .await?;
        debug!(uuid = %result.device.uuid, hostname = %result.device.hostname, "Device connected in directory");
        Ok(result.device)
    }

    async fn disconnect_device(&self, uuid: &str) -> AppResult<DeviceIdentity> {
        let result: DeviceResult = self
            .client
            .run(FN_DISCONNECT_DEVICE, &DeviceParams { uuid })
            .await?;
        Ok(result.device)
    }
}

#[async_trait]
impl ProcessingService for CloudDirectory {
    async fn handle_payload(&self, payload: &Value) -> AppResult<PayloadReceipt> {
        self.client
            .run(FN_HANDLE_PAYLOAD, &PayloadParams { payload })
            .await
    }
}
