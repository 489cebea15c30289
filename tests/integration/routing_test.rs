//! Integration tests for inbound publish routing.

mod helpers;

use serde_json::json;

use sensbox_overlay::router::RouteOutcome;
use sensbox_registry::RegistryEntry;

use helpers::{FakeDirectory, TestOverlay};

#[tokio::test]
async fn test_message_is_forwarded_untouched() {
    let t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;
    let body = json!({
        "agent": {"uuid": "d1"},
        "metrics": [
            {"time": "2024-01-01T00:00:00Z", "type": "cpu", "value": 0.5},
            {"time": 1704067200, "type": "mem", "value": 2048}
        ],
        "extra": "kept"
    });

    let outcome = t
        .overlay
        .on_publish(&c1, "agent/message", &serde_json::to_vec(&body).unwrap())
        .await;
    t.overlay.router.flush().await;

    assert_eq!(outcome, RouteOutcome::Forwarded);
    assert_eq!(t.directory.payloads(), vec![body]);
    assert_eq!(t.overlay.metrics.snapshot().messages_forwarded, 1);
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let mut t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    let outcome = t.overlay.on_publish(&c1, "agent/message", b"{not json").await;
    t.overlay.router.flush().await;

    assert_eq!(outcome, RouteOutcome::Dropped);
    assert!(t.directory.calls().is_empty());
    assert!(t.drain_broadcasts().is_empty());
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Pending);
    assert_eq!(t.overlay.metrics.snapshot().messages_dropped, 1);
}

#[tokio::test]
async fn test_schema_mismatch_is_dropped() {
    let t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    let outcome = t
        .overlay
        .on_publish(&c1, "agent/message", br#"{"metrics": []}"#)
        .await;
    t.overlay.router.flush().await;

    assert_eq!(outcome, RouteOutcome::Dropped);
    assert!(t.directory.payloads().is_empty());
}

#[tokio::test]
async fn test_identification_failure_still_forwards() {
    let directory = FakeDirectory::new();
    directory.fail_connect();
    let mut t = TestOverlay::with_directory(directory);
    let (c1, _rx) = t.open("c1").await;

    t.send_message(&c1, "d1").await;
    t.overlay.router.flush().await;

    assert_eq!(t.directory.connects("d1"), 1);
    assert_eq!(t.directory.payloads().len(), 1);
    assert!(t.drain_broadcasts().is_empty());
}

#[tokio::test]
async fn test_processing_failure_is_logged_only() {
    let directory = FakeDirectory::new();
    directory.fail_processing();
    let t = TestOverlay::with_directory(directory);
    let (c1, _rx) = t.open("c1").await;

    t.send_message(&c1, "d1").await;
    t.overlay.router.flush().await;

    let snapshot = t.overlay.metrics.snapshot();
    assert_eq!(snapshot.forward_failures, 1);
    assert_eq!(snapshot.messages_forwarded, 0);
    assert_eq!(t.directory.payloads().len(), 1);
    // Presence is unaffected by the processing outcome.
    assert!(t.registry.get(&c1).await.unwrap().session().is_some());
}

#[tokio::test]
async fn test_announcements_are_observed_not_routed() {
    let t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;
    let body = br#"{"agent":{"uuid":"d1"}}"#;

    assert_eq!(
        t.overlay.on_publish(&c1, "agent/connected", body).await,
        RouteOutcome::Observed
    );
    assert_eq!(
        t.overlay.on_publish(&c1, "agent/disconnected", body).await,
        RouteOutcome::Observed
    );
    t.overlay.router.flush().await;

    assert!(t.directory.calls().is_empty());
    assert_eq!(t.registry.get(&c1).await.unwrap(), RegistryEntry::Pending);
}

#[tokio::test]
async fn test_other_topics_are_ignored() {
    let t = TestOverlay::new();
    let (c1, _rx) = t.open("c1").await;

    let outcome = t
        .overlay
        .on_publish(&c1, "devices/d1/status", &helpers::agent_message("d1"))
        .await;
    t.overlay.router.flush().await;

    assert_eq!(outcome, RouteOutcome::Ignored);
    assert!(t.directory.calls().is_empty());
    assert_eq!(t.overlay.metrics.snapshot().messages_received, 0);
}
