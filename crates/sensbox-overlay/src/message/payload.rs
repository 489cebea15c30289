//! Application payload parsing.
//!
//! Two stages: bytes -> JSON value, then JSON value -> [`AgentMessage`].
//! Either stage failing yields a [`ParseError`]; there is no null sentinel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use sensbox_core::error::{AppError, ErrorKind};

/// Why an inbound payload was rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes are not JSON.
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The JSON does not have the agent message shape.
    #[error("payload does not match the agent message schema: {0}")]
    Schema(String),
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::with_source(ErrorKind::Parse, err.to_string(), err)
    }
}

/// `agent/message` body: `{agent: {uuid}, metrics: [{time, type, value}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Sending device.
    pub agent: AgentRef,
    /// Telemetry samples.
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

/// Device reference inside an agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    /// Device UUID.
    pub uuid: String,
}

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Sample time, as sent by the device. `null` when omitted.
    #[serde(default)]
    pub time: Value,
    /// Metric type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Sample value. `null` when omitted.
    #[serde(default)]
    pub value: Value,
}

/// A validated message together with the JSON it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    /// JSON forwarded to the processing service, untouched.
    pub raw: Value,
    /// Typed view used for identification.
    pub message: AgentMessage,
}

impl ParsedMessage {
    /// UUID of the sending device.
    pub fn device_uuid(&self) -> &str {
        &self.message.agent.uuid
    }
}

/// Parse bytes into a JSON value.
pub fn parse_payload(bytes: &[u8]) -> Result<Value, ParseError> {
    serde_json::from_slice(bytes).map_err(ParseError::Malformed)
}

/// Parse and validate an `agent/message` payload.
pub fn parse_agent_message(bytes: &[u8]) -> Result<ParsedMessage, ParseError> {
    let raw = parse_payload(bytes)?;
    let message: AgentMessage =
        serde_json::from_value(raw.clone()).map_err(|e| ParseError::Schema(e.to_string()))?;
    if message.agent.uuid.trim().is_empty() {
        return Err(ParseError::Schema("agent.uuid is empty".to_string()));
    }
    Ok(ParsedMessage { raw, message })
}
