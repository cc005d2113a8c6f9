mod common;

use chrono::Duration;
use std::sync::Arc;

use ambulance_dispatch::models::dispatch::DispatchStatus;
use ambulance_dispatch::models::event::{EventKind, OutboxStatus};
use ambulance_dispatch::services::assignment_service::{DispatchOutcome, DispatchRequest};
use ambulance_dispatch::services::event_notifier::RecordingNotifier;
use ambulance_dispatch::services::outbox_relay::{OutboxRelay, RelayConfig, RelayStats};
use ambulance_dispatch::utils::clock::Clock;

use common::{Harness, ORIGIN};

fn relay(h: &Harness, notifier: Arc<RecordingNotifier>, config: RelayConfig) -> OutboxRelay {
    OutboxRelay::new(
        h.directory.clone(),
        notifier,
        Some(h.predictor.clone()),
        h.clock.clone(),
        config,
    )
}

async fn dispatch_id(h: &Harness) -> i64 {
    match h.engine.create_dispatch(DispatchRequest::at(ORIGIN)).await.unwrap() {
        DispatchOutcome::Created { dispatch, .. } => dispatch.id,
        other => panic!("expected a created dispatch, got {:?}", other),
    }
}

async fn wait_for_feedback(h: &Harness, expected: usize) -> bool {
    for _ in 0..50 {
        if h.model.feedback_count() >= expected {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_delivers_pending_events_once() {
    let h = Harness::new();
    h.seed_minimal().await;
    dispatch_id(&h).await;

    let notifier = Arc::new(RecordingNotifier::new());
    let relay = relay(&h, notifier.clone(), RelayConfig::default());

    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.delivered, 1);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::DispatchCreated);

    let outbox = h.directory.outbox().await;
    assert_eq!(outbox[0].status, OutboxStatus::Delivered);
    assert_eq!(outbox[0].delivered_at, Some(h.clock.now()));

    assert_eq!(relay.run_once().await.unwrap(), RelayStats::default());
    assert_eq!(notifier.events().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_after_backoff() {
    let h = Harness::new();
    h.seed_minimal().await;
    dispatch_id(&h).await;

    let notifier = Arc::new(RecordingNotifier::new());
    notifier.fail_next(1);
    let relay = relay(&h, notifier.clone(), RelayConfig::default());

    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.retried, 1);
    let outbox = h.directory.outbox().await;
    assert_eq!(outbox[0].status, OutboxStatus::Pending);
    assert_eq!(outbox[0].attempts, 1);
    assert!(outbox[0].next_attempt_at > h.clock.now());
    assert!(outbox[0].last_error.is_some());

    // todavía en backoff
    assert_eq!(relay.run_once().await.unwrap(), RelayStats::default());

    h.clock.advance(Duration::seconds(3));
    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(notifier.events().len(), 1);
    assert_eq!(h.directory.outbox().await[0].attempts, 2);
}

#[tokio::test]
async fn test_exhausted_attempts_mark_event_dead() {
    let h = Harness::new();
    h.seed_minimal().await;
    dispatch_id(&h).await;

    let notifier = Arc::new(RecordingNotifier::new());
    notifier.fail_next(10);
    let relay = relay(
        &h,
        notifier.clone(),
        RelayConfig {
            max_attempts: 2,
            ..RelayConfig::default()
        },
    );

    assert_eq!(relay.run_once().await.unwrap().retried, 1);
    h.clock.advance(Duration::seconds(3));
    assert_eq!(relay.run_once().await.unwrap().dead, 1);

    let outbox = h.directory.outbox().await;
    assert_eq!(outbox[0].status, OutboxStatus::Dead);
    assert_eq!(outbox[0].attempts, 2);

    h.clock.advance(Duration::minutes(10));
    assert_eq!(relay.run_once().await.unwrap(), RelayStats::default());
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn test_completed_dispatch_feeds_the_model() {
    let h = Harness::new();
    h.seed_minimal().await;
    let id = dispatch_id(&h).await;
    for status in [
        DispatchStatus::EnRoute,
        DispatchStatus::OnScene,
        DispatchStatus::Transporting,
    ] {
        h.clock.advance(Duration::minutes(5));
        h.lifecycle.transition(id, status).await.unwrap();
    }
    h.clock.advance(Duration::minutes(5));
    h.lifecycle.transition(id, DispatchStatus::Completed).await.unwrap();

    let notifier = Arc::new(RecordingNotifier::new());
    let relay = relay(&h, notifier.clone(), RelayConfig::default());
    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.delivered, h.directory.outbox().await.len());

    let concluded = notifier
        .events()
        .into_iter()
        .find(|e| e.kind == EventKind::DispatchConcluded)
        .unwrap();
    assert_eq!(concluded.payload_str("outcome"), Some("completed"));
    assert!(wait_for_feedback(&h, 1).await);
}

#[tokio::test]
async fn test_cancelled_dispatch_does_not_feed_the_model() {
    let h = Harness::new();
    h.seed_minimal().await;
    let id = dispatch_id(&h).await;
    h.lifecycle.transition(id, DispatchStatus::Cancelled).await.unwrap();

    let notifier = Arc::new(RecordingNotifier::new());
    let relay = relay(&h, notifier.clone(), RelayConfig::default());
    relay.run_once().await.unwrap();

    assert!(notifier
        .events()
        .iter()
        .any(|e| e.kind == EventKind::DispatchConcluded));
    assert!(!wait_for_feedback(&h, 1).await);
}

#[tokio::test]
async fn test_delivered_events_are_purged_after_retention() {
    let h = Harness::new();
    h.seed_minimal().await;
    dispatch_id(&h).await;

    let notifier = Arc::new(RecordingNotifier::new());
    notifier.fail_next(1);
    let relay = relay(
        &h,
        notifier.clone(),
        RelayConfig {
            delivered_retention: std::time::Duration::ZERO,
            ..RelayConfig::default()
        },
    );

    // un evento pendiente de reintento no se borra
    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.retried, 1);
    assert_eq!(stats.purged, 0);
    assert_eq!(h.directory.outbox().await.len(), 1);

    h.clock.advance(Duration::seconds(3));
    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(h.directory.outbox().await[0].status, OutboxStatus::Delivered);

    h.clock.advance(Duration::seconds(1));
    let stats = relay.run_once().await.unwrap();
    assert_eq!(stats.purged, 1);
    assert!(h.directory.outbox().await.is_empty());
    assert_eq!(notifier.events().len(), 1);
}
