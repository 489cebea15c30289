//! Integration tests for device presence reconciliation.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sensbox_core::types::ConnectionId;
use sensbox_overlay::presence::{ConnectionState, IdentifyOutcome};
use sensbox_registry::RegistryEntry;
use sensbox_registry::memory::MemoryStore;

use helpers::{FailingStore, FakeDirectory, TestOverlay};

#[tokio::test]
async fn test_connect_identify_disconnect_lifecycle() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Pending);

    t.send_message(&c1, "d1").await;

    assert_eq!(t.directory.connects("d1"), 1);
    let entry = t.registry.get(&c1).await.unwrap();
    assert_eq!(entry.session().unwrap().device_uuid, "d1");
    assert_eq!(
        t.drain_broadcasts(),
        vec![(
            "agent/connected".to_string(),
            json!({"agent": {"uuid": "d1", "hostname": "d1-host", "connected": true}})
        )]
    );

    let session = t.close(&c1).await.unwrap();
    assert_eq!(session.device_uuid, "d1");

    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Absent);
    assert_eq!(
        t.drain_broadcasts(),
        vec![(
            "agent/disconnected".to_string(),
            json!({"agent": {"uuid": "d1"}})
        )]
    );
    assert_eq!(t.directory.disconnects("d1"), 1);
}

#[tokio::test]
async fn test_disconnect_before_identification_is_silent() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    assert!(t.close(&c1).await.is_none());

    assert!(t.drain_broadcasts().is_empty());
    assert!(t.directory.calls().is_empty());
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Absent);
}

#[tokio::test]
async fn test_repeated_messages_announce_once() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    t.send_message(&c1, "d1").await;
    t.send_message(&c1, "d1").await;
    t.send_message(&c1, "d1").await;

    assert_eq!(t.directory.connects("d1"), 1);
    let connected: Vec<_> = t
        .drain_broadcasts()
        .into_iter()
        .filter(|(topic, _)| topic == "agent/connected")
        .collect();
    assert_eq!(connected.len(), 1);
}

#[tokio::test]
async fn test_concurrent_messages_announce_once() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    let msg = helpers::agent_message("d1");
    let (a, b, c) = tokio::join!(
        t.overlay.on_publish(&c1, "agent/message", &msg),
        t.overlay.on_publish(&c1, "agent/message", &msg),
        t.overlay.on_publish(&c1, "agent/message", &msg),
    );
    assert_eq!(a, b);
    assert_eq!(b, c);

    assert_eq!(t.directory.connects("d1"), 1);
    let announcements = t.drain_broadcasts();
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0].0, "agent/connected");
}

#[tokio::test]
async fn test_disconnect_racing_identification_still_announces() {
    let directory = FakeDirectory::new();
    directory.hold_connect();
    let mut t = TestOverlay::with_directory(directory);
    let (c1, _rx) = t.open("c1").await;

    let overlay = t.overlay.clone();
    let id = c1.clone();
    let publish = tokio::spawn(async move {
        overlay
            .on_publish(&id, "agent/message", &helpers::agent_message("d1"))
            .await
    });
    t.directory.connect_entered.notified().await;

    let overlay = t.overlay.clone();
    let engine = t.engine.clone();
    let id = c1.clone();
    let disconnect = tokio::spawn(async move {
        engine.unregister(&id);
        overlay.on_disconnect(&id).await
    });

    // Let the disconnect reach the slot lock before identification resumes.
    tokio::time::sleep(Duration::from_millis(20)).await;
    t.directory.connect_release.notify_one();

    publish.await.unwrap();
    let session = disconnect.await.unwrap();
    assert_eq!(session.unwrap().device_uuid, "d1");

    let topics: Vec<String> = t.drain_broadcasts().into_iter().map(|(t, _)| t).collect();
    assert_eq!(topics, vec!["agent/connected", "agent/disconnected"]);
    assert_eq!(t.directory.disconnects("d1"), 1);
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Absent);
}

#[tokio::test]
async fn test_failed_identification_retries_on_next_message() {
    let directory = FakeDirectory::new();
    directory.fail_connect();
    let mut t = TestOverlay::with_directory(directory);
    let (c1, _rx) = t.open("c1").await;

    t.send_message(&c1, "d1").await;

    assert_eq!(
        t.overlay.presence.state(&c1).await,
        Some(ConnectionState::New)
    );
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Pending);
    assert!(t.drain_broadcasts().is_empty());
    assert_eq!(t.overlay.metrics.snapshot().identify_failures, 1);

    t.send_message(&c1, "d1").await;
    assert_eq!(t.directory.connects("d1"), 2);

    // Never identified: no disconnect side effects either.
    assert!(t.close(&c1).await.is_none());
    assert_eq!(t.directory.disconnects("d1"), 0);
}

#[tokio::test]
async fn test_identified_session_in_registry_is_adopted() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;
    t.send_message(&c1, "d1").await;
    t.drain_broadcasts();

    // A second overlay process sharing the registry sees the same connection.
    let other = sensbox_overlay::Overlay::new(
        t.registry.clone(),
        t.directory.clone(),
        t.directory.clone(),
        t.engine.clone(),
    );
    let outcome = other.presence.identify(&c1, "d1").await.unwrap();

    assert_eq!(outcome, IdentifyOutcome::AlreadyIdentified);
    assert_eq!(t.directory.connects("d1"), 1);
    assert!(t.drain_broadcasts().is_empty());
}

#[tokio::test]
async fn test_identified_row_outlives_ttl_while_device_sends() {
    let t = TestOverlay::with_store(FakeDirectory::new(), Arc::new(MemoryStore::new()), 1);
    let (c1, _rx) = t.open("c1").await;
    t.send_message(&c1, "d1").await;

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(600)).await;
        t.send_message(&c1, "d1").await;
    }

    assert_eq!(
        t.registry.get(&c1).await.unwrap().session().unwrap().device_uuid,
        "d1"
    );
    assert!(t.registry.reverse_lookup("d1").await.unwrap().contains(&c1));
    assert_eq!(t.directory.connects("d1"), 1);
}

#[tokio::test]
async fn test_registry_outage_does_not_block_presence() {
    let mut t = TestOverlay::with_store(FakeDirectory::new(), Arc::new(FailingStore), 60);
    let (c1, _rx) = t.open("c1").await;
    assert_eq!(t.overlay.metrics.snapshot().store_failures, 1);

    t.send_message(&c1, "d1").await;

    assert!(matches!(
        t.overlay.presence.state(&c1).await,
        Some(ConnectionState::Identified(_))
    ));
    assert_eq!(t.overlay.metrics.snapshot().store_failures, 3);

    let session = t.close(&c1).await.unwrap();

    assert_eq!(session.device_uuid, "d1");
    assert_eq!(t.directory.disconnects("d1"), 1);
    let topics: Vec<String> = t.drain_broadcasts().into_iter().map(|(topic, _)| topic).collect();
    assert_eq!(topics, vec!["agent/connected", "agent/disconnected"]);
    assert_eq!(t.overlay.metrics.snapshot().store_failures, 4);
}

#[tokio::test]
async fn test_reopened_connection_id_starts_unidentified() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;
    t.send_message(&c1, "d1").await;
    t.drain_broadcasts();

    // Transport reports a new connection under an id it never closed.
    t.overlay.on_connect(&c1).await;

    assert_eq!(t.overlay.presence.state(&c1).await, Some(ConnectionState::New));
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Pending);
    assert_eq!(t.overlay.presence.tracked(), 1);

    t.send_message(&c1, "d2").await;
    assert_eq!(t.directory.connects("d2"), 1);
    assert_eq!(t.drain_broadcasts()[0].1["agent"]["uuid"], "d2");
}

#[tokio::test]
async fn test_message_after_close_does_not_identify() {
    let t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;
    t.close(&c1).await;

    let outcome = t.overlay.presence.identify(&c1, "d1").await.unwrap();

    assert_eq!(outcome, IdentifyOutcome::Closed);
    assert_eq!(t.directory.connects("d1"), 0);
    assert_eq!(t.overlay.presence.tracked(), 0);
}

#[tokio::test]
async fn test_connections_are_independent() {
    let mut t = TestOverlay::new();
    let (c1, _rx1) = t.open("c1").await;
    let (c2, _rx2) = t.open("c2").await;

    t.send_message(&c1, "d1").await;
    t.send_message(&c2, "d2").await;
    t.close(&c1).await;

    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Absent);
    assert_eq!(
        t.registry.get(&c2).await.unwrap().session().unwrap().device_uuid,
        "d2"
    );
    let topics: Vec<(String, String)> = t
        .drain_broadcasts()
        .into_iter()
        .map(|(topic, body)| (topic, body["agent"]["uuid"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        topics,
        vec![
            ("agent/connected".to_string(), "d1".to_string()),
            ("agent/connected".to_string(), "d2".to_string()),
            ("agent/disconnected".to_string(), "d1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_auth_rejection_uses_fixed_code() {
    let directory = FakeDirectory::new();
    directory.reject_auth();
    let t = TestOverlay::with_directory(directory);
    let id = ConnectionId::new("c1");

    let decision = t.overlay.authenticate(&id, Some(b"dev".as_slice()), None).await;

    assert_eq!(
        decision,
        sensbox_overlay::AuthDecision::Reject { return_code: 4 }
    );
    assert_eq!(
        t.directory.calls(),
        vec![helpers::Call::Authorize {
            username: Some("dev".to_string()),
            password: None,
        }]
    );
    assert_eq!(t.overlay.metrics.snapshot().auth_rejected, 1);
    assert_eq!(t.registry.get(&id).await.unwrap(), RegistryEntry::Absent);
}

#[tokio::test]
async fn test_auth_accepts_valid_credentials() {
    let t = TestOverlay::new();
    let id = ConnectionId::new("c1");

    let decision = t.overlay.authenticate(&id, Some(b"dev".as_slice()), Some(b"".as_slice())).await;

    assert!(decision.is_accepted());
    assert_eq!(
        t.directory.calls(),
        vec![helpers::Call::Authorize {
            username: Some("dev".to_string()),
            password: Some(String::new()),
        }]
    );
}
