//! Integration tests for configuration fan-out.

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::watch;

use sensbox_core::result::AppResult;
use sensbox_core::traits::{ChangeFeed, ConfigurationStream};
use sensbox_core::types::ConfigurationEvent;

use helpers::{FailingStore, FakeDirectory, TestOverlay};

fn config_event(uuid: &str, seq: &str, payload: Value) -> ConfigurationEvent {
    ConfigurationEvent {
        target_device_uuid: uuid.to_string(),
        configuration_payload: payload,
        sequence_id: seq.to_string(),
    }
}

/// Feed replaying a fixed list of records, then ending.
#[derive(Debug)]
struct StaticFeed {
    events: Vec<ConfigurationEvent>,
}

#[async_trait]
impl ChangeFeed for StaticFeed {
    async fn subscribe(&self) -> AppResult<ConfigurationStream> {
        Ok(futures::stream::iter(self.events.clone()).boxed())
    }
}

#[tokio::test]
async fn test_configuration_is_unicast_to_target_device() {
    let t = TestOverlay::new();
    let (c1, mut rx1) = t.open("c1").await;
    let (c2, mut rx2) = t.open("c2").await;
    t.send_message(&c1, "d1").await;
    t.send_message(&c2, "d2").await;

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d2", "seq-1", json!({"interval": 30})))
        .await;

    assert_eq!(delivered, 1);
    let packet = rx2.try_recv().unwrap();
    assert_eq!(packet.topic, "agent/configuration");
    let body: Value = serde_json::from_slice(&packet.payload).unwrap();
    assert_eq!(
        body,
        json!({"agent": {"uuid": "d2"}, "configurations": {"interval": 30}})
    );
    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn test_configuration_without_match_is_dropped() {
    let mut t = TestOverlay::new();
    let (c1, mut rx1) = t.open("c1").await;
    t.send_message(&c1, "d1").await;
    t.drain_broadcasts();

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d9", "seq-1", json!({})))
        .await;

    assert_eq!(delivered, 0);
    assert!(rx1.try_recv().is_err());
    assert!(t.drain_broadcasts().is_empty());
    assert_eq!(t.overlay.metrics.snapshot().configurations_unmatched, 1);
}

#[tokio::test]
async fn test_unidentified_connection_receives_nothing() {
    let t = TestOverlay::new();
    let (_c1, mut rx1) = t.open("c1").await;

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d1", "seq-1", json!({})))
        .await;

    assert_eq!(delivered, 0);
    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn test_connection_not_live_is_skipped() {
    let t = TestOverlay::new();
    let (c1, _rx1) = t.open("c1").await;
    t.send_message(&c1, "d1").await;

    // Gone from the engine while its registry row lingers.
    t.engine.unregister(&c1);

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d1", "seq-1", json!({"a": 1})))
        .await;

    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_every_connection_of_a_device_is_reached() {
    let t = TestOverlay::new();
    let (c1, mut rx1) = t.open("c1").await;
    let (c2, mut rx2) = t.open("c2").await;
    t.send_message(&c1, "d1").await;
    t.send_message(&c2, "d1").await;

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d1", "seq-1", json!({"a": 1})))
        .await;

    assert_eq!(delivered, 2);
    assert!(rx1.try_recv().is_ok());
    assert!(rx2.try_recv().is_ok());
}

#[tokio::test]
async fn test_listener_delivers_feed_records() {
    let t = TestOverlay::new();
    let (c1, mut rx1) = t.open("c1").await;
    t.send_message(&c1, "d1").await;

    let feed = Arc::new(StaticFeed {
        events: vec![
            config_event("d1", "seq-1", json!({"rate": 1})),
            config_event("d2", "seq-2", json!({"rate": 2})),
            config_event("d1", "seq-3", json!({"rate": 3})),
        ],
    });
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    t.overlay.fanout.run(feed, shutdown_rx).await.unwrap();

    let first: Value = serde_json::from_slice(&rx1.try_recv().unwrap().payload).unwrap();
    let second: Value = serde_json::from_slice(&rx1.try_recv().unwrap().payload).unwrap();
    assert_eq!(first["configurations"], json!({"rate": 1}));
    assert_eq!(second["configurations"], json!({"rate": 3}));
    assert!(rx1.try_recv().is_err());

    let snapshot = t.overlay.metrics.snapshot();
    assert_eq!(snapshot.configurations_delivered, 2);
    assert_eq!(snapshot.configurations_unmatched, 1);
}

#[tokio::test]
async fn test_registry_outage_drops_configuration() {
    let t = TestOverlay::with_store(FakeDirectory::new(), Arc::new(FailingStore), 60);
    let (c1, mut rx1) = t.open("c1").await;
    t.send_message(&c1, "d1").await;
    let before = t.overlay.metrics.snapshot().store_failures;

    let delivered = t
        .overlay
        .fanout
        .dispatch(&config_event("d1", "seq-1", json!({"a": 1})))
        .await;

    assert_eq!(delivered, 0);
    assert!(rx1.try_recv().is_err());
    assert_eq!(t.overlay.metrics.snapshot().store_failures, before + 1);
}
