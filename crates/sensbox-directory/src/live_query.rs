//! Live-query websocket subscription for configuration records.
//!
//! Protocol: `connect` (app id + master key) -> `connected`, then one
//! `subscribe` for the configured class filtered on `topic` -> `subscribed`,
//! then a `create` frame for every new record. No reconnect: the stream
//! ends when the socket closes.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use sensbox_core::config::directory::DirectoryConfig;
use sensbox_core::config::feed::FeedConfig;
use sensbox_core::error::{AppError, ErrorKind};
use sensbox_core::result::AppResult;
use sensbox_core::traits::{ChangeFeed, ConfigurationStream};
use sensbox_core::types::ConfigurationEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIPTION_REQUEST_ID: u64 = 1;
const EVENT_BUFFER: usize = 64;

/// Configuration change feed over a live-query server.
#[derive(Clone)]
pub struct LiveQueryFeed {
    url: String,
    app_id: String,
    master_key: String,
    class_name: String,
    topic: String,
}

impl std::fmt::Debug for LiveQueryFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQueryFeed")
            .field("url", &self.url)
            .field("class_name", &self.class_name)
            .field("topic", &self.topic)
            .finish()
    }
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Connected,
    Subscribed,
    Create(ConfigurationEvent),
    Error { code: i64, message: String },
    Other,
}

#[derive(Deserialize)]
struct RawFrame {
    op: String,
    #[serde(default)]
    object: Option<Value>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

impl LiveQueryFeed {
    /// Build a feed from its websocket URL and the directory credentials.
    pub fn new(url: impl Into<String>, directory: &DirectoryConfig, feed: &FeedConfig) -> Self {
        Self {
            url: url.into(),
            app_id: directory.app_id.clone(),
            master_key: directory.master_key.clone(),
            class_name: feed.class_name.clone(),
            topic: feed.topic.clone(),
        }
    }

    fn connect_frame(&self) -> Message {
        Message::text(
            json!({
                "op": "connect",
                "applicationId": self.app_id,
                "masterKey": self.master_key,
            })
            .to_string(),
        )
    }

    fn subscribe_frame(&self) -> Message {
        Message::text(
            json!({
                "op": "subscribe",
                "requestId": SUBSCRIPTION_REQUEST_ID,
                "query": {
                    "className": self.class_name,
                    "where": { "topic": self.topic },
                },
            })
            .to_string(),
        )
    }

    async fn handshake(&self, ws: &mut WsStream) -> AppResult<()> {
        send(ws, self.connect_frame()).await?;
        expect(ws, Frame::Connected).await?;
        send(ws, self.subscribe_frame()).await?;
        expect(ws, Frame::Subscribed).await?;
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for LiveQueryFeed {
    async fn subscribe(&self) -> AppResult<ConfigurationStream> {
        info!(url = %self.url, class = %self.class_name, "Subscribing to configuration feed");

        let (mut ws, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            AppError::with_source(ErrorKind::Feed, "Failed to open live-query socket", e)
        })?;
        self.handshake(&mut ws).await?;
        info!("Configuration feed subscribed");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(read_loop(ws, tx));

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }
}

async fn send(ws: &mut WsStream, frame: Message) -> AppResult<()> {
    ws.send(frame)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Feed, "Live-query send failed", e))
}

async fn expect(ws: &mut WsStream, wanted: Frame) -> AppResult<()> {
    while let Some(msg) = ws.next().await {
        let msg =
            msg.map_err(|e| AppError::with_source(ErrorKind::Feed, "Live-query read failed", e))?;
        let Message::Text(text) = msg else {
            continue;
        };
        match decode_frame(text.as_str()) {
            frame if frame == wanted => return Ok(()),
            Frame::Error { code, message } => {
                return Err(AppError::feed(format!(
                    "Live-query refused handshake (code {code}): {message}"
                )));
            }
            other => debug!(frame = ?other, "Ignoring frame during handshake"),
        }
    }
    Err(AppError::feed("Live-query socket closed during handshake"))
}

async fn read_loop(mut ws: WsStream, tx: mpsc::Sender<ConfigurationEvent>) {
    while let Some(msg) = ws.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Configuration feed read failed");
                break;
            }
        };
        match decode_frame(text.as_str()) {
            Frame::Create(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Frame::Error { code, message } => {
                warn!(code, message = %message, "Configuration feed error");
            }
            _ => {}
        }
    }
    info!("Configuration feed closed");
}

fn decode_frame(text: &str) -> Frame {
    let raw: RawFrame = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Undecodable live-query frame");
            return Frame::Other;
        }
    };

    match raw.op.as_str() {
        "connected" => Frame::Connected,
        "subscribed" => Frame::Subscribed,
        "error" => Frame::Error {
            code: raw.code.unwrap_or_default(),
            message: raw.error.unwrap_or_default(),
        },
        "create" => match raw.object.as_ref().and_then(to_event) {
            Some(event) => Frame::Create(event),
            None => {
                warn!("Configuration record without a target uuid");
                Frame::Other
            }
        },
        _ => Frame::Other,
    }
}

fn to_event(object: &Value) -> Option<ConfigurationEvent> {
    let uuid = object.get("uuid")?.as_str()?;
    Some(ConfigurationEvent {
        target_device_uuid: uuid.to_string(),
        configuration_payload: object.get("payload").cloned().unwrap_or(Value::Null),
        sequence_id: object
            .get("objectId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}
