//! Integration tests for coldwatch-core.
//!
//! These run the synchronization core end to end against the in-memory
//! mock store, exercising the bootstrap, push, reconnect, command, and
//! settings paths the way a dashboard front end would drive them.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use coldwatch_core::mock::MockStore;
use coldwatch_core::{
    CommandKind, ConnectionStatus, DeviceSettings, Error, Reading, SessionConfig, SessionEvent,
    SessionRegistry, SettingsEditor, SubscriptionStatus, TelemetryStore,
};

fn reading(id: i64, unix: i64, temperature: f64, actuator_on: bool) -> Reading {
    Reading {
        id,
        device_id: 3,
        timestamp: OffsetDateTime::from_unix_timestamp(unix).unwrap(),
        temperature,
        actuator_on,
    }
}

fn registry_over(store: &Arc<MockStore>, config: SessionConfig) -> SessionRegistry {
    SessionRegistry::new(Arc::clone(store) as Arc<dyn TelemetryStore>, config).unwrap()
}

/// Let the session actors drain their channels.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_bootstrap_then_live_updates() {
    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(10, 100, 5.0, false)).await;
    let registry = registry_over(&store, SessionConfig::default());

    let session = registry.acquire(3).await;
    assert_eq!(session.view().status, ConnectionStatus::Connecting);

    settle().await;

    let view = session.view();
    assert_eq!(view.status, ConnectionStatus::Live);
    assert_eq!(view.latest.unwrap().id, 10);

    // A fresh insert flows through push into latest and history.
    store.insert_reading(reading(11, 110, 4.8, false)).await;
    settle().await;

    let view = session.view();
    assert_eq!(view.latest.unwrap().id, 11);
    let ids: Vec<i64> = view.history.iter().map(|s| s.key.id).collect();
    assert_eq!(ids, vec![10, 11]);

    registry.release(3).await;
}

#[tokio::test]
async fn test_stale_out_of_order_push_scenario() {
    // Device 3 holds latest {id:10, t:100}; a stale push {id:9, t:95}
    // arrives afterwards. History gains both samples in time order,
    // latest.id stays 10.
    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(10, 100, 5.0, false)).await;
    let registry = registry_over(&store, SessionConfig::default());

    let session = registry.acquire(3).await;
    settle().await;

    store.push_reading(reading(9, 95, 5.2, false)).await;
    settle().await;

    let view = session.view();
    assert_eq!(view.latest.unwrap().id, 10);
    let ids: Vec<i64> = view.history.iter().map(|s| s.key.id).collect();
    assert_eq!(ids, vec![9, 10]);

    registry.release(3).await;
}

#[tokio::test]
async fn test_at_least_once_delivery_is_absorbed() {
    let store = Arc::new(MockStore::new());
    let registry = registry_over(&store, SessionConfig::default());
    let session = registry.acquire(3).await;
    settle().await;

    // The same batch delivered twice, second time reversed.
    let batch = [
        reading(1, 10, 5.0, false),
        reading(2, 20, 4.9, false),
        reading(3, 30, 4.7, true),
    ];
    for r in &batch {
        store.push_reading(*r).await;
    }
    settle().await;
    let once = session.view();

    for r in batch.iter().rev() {
        store.push_reading(*r).await;
    }
    settle().await;
    let twice = session.view();

    assert_eq!(once, twice);
    assert_eq!(twice.latest.unwrap().id, 3);
    assert_eq!(twice.history.len(), 3);

    registry.release(3).await;
}

#[tokio::test]
async fn test_gap_healing_recovers_missed_readings() {
    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(10, 100, 5.0, false)).await;
    let registry = registry_over(
        &store,
        SessionConfig::default().gap_threshold(Duration::from_secs(1)),
    );

    let session = registry.acquire(3).await;
    settle().await;
    assert_eq!(session.view().latest.unwrap().id, 10);

    // Transport hiccup: the subscription degrades while the device keeps
    // reporting into the store.
    store
        .push_status(SubscriptionStatus::Error("transport hiccup".into()))
        .await;
    settle().await;
    assert_eq!(session.view().status, ConnectionStatus::Degraded);

    store.seed_reading(reading(11, 200, 4.9, false)).await;
    store.seed_reading(reading(12, 300, 4.7, false)).await;

    // Recovery: the held latest (t=100) is far older than the gap
    // threshold, so the session backfills the missed range.
    store.push_status(SubscriptionStatus::Subscribed).await;
    settle().await;

    let view = session.view();
    assert_eq!(view.status, ConnectionStatus::Live);
    assert_eq!(view.latest.unwrap().id, 12);
    let ids: Vec<i64> = view.history.iter().map(|s| s.key.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
    assert!(store.fetch_range_calls() >= 1);

    registry.release(3).await;
}

#[tokio::test]
async fn test_command_confirmed_through_registry() {
    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(10, 100, 5.0, false)).await;
    let registry = registry_over(&store, SessionConfig::default());

    let session = registry.acquire(3).await;
    settle().await;
    let mut events = session.events();

    registry
        .issue_command(3, CommandKind::SetActuator { on: true })
        .await
        .unwrap();
    settle().await;

    // Optimistic view while the device has not reported back.
    let view = session.view();
    assert!(!view.latest.unwrap().actuator_on);
    assert_eq!(view.effective_actuator_on(), Some(true));

    // The device reports the commanded state.
    store.insert_reading(reading(11, 110, 5.0, true)).await;
    settle().await;

    let view = session.view();
    assert!(view.pending_command.is_none());
    assert_eq!(view.effective_actuator_on(), Some(true));

    let mut confirmed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::CommandConfirmed { .. }) {
            confirmed = true;
        }
    }
    assert!(confirmed);

    registry.release(3).await;
}

#[tokio::test(start_paused = true)]
async fn test_command_timeout_reported_not_swallowed() {
    let store = Arc::new(MockStore::new());
    let registry = registry_over(
        &store,
        SessionConfig::default().command_timeout(Duration::from_secs(5)),
    );

    let session = registry.acquire(3).await;
    settle().await;
    let mut events = session.events();

    registry
        .issue_command(3, CommandKind::SetActuator { on: true })
        .await
        .unwrap();
    settle().await;
    assert!(session.view().pending_command.is_some());

    tokio::time::sleep(Duration::from_secs(6)).await;
    settle().await;

    assert!(session.view().pending_command.is_none());
    let mut timed_out = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::CommandTimedOut { device_id, kind } = event {
            assert_eq!(device_id, 3);
            assert_eq!(kind, CommandKind::SetActuator { on: true });
            timed_out = true;
        }
    }
    assert!(timed_out);

    registry.release(3).await;
}

#[tokio::test]
async fn test_navigate_away_and_back() {
    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(10, 100, 5.0, false)).await;
    let registry = registry_over(&store, SessionConfig::default());

    // Two widgets on the same page share one session.
    let header = registry.acquire(3).await;
    let chart = registry.acquire(3).await;
    settle().await;
    assert_eq!(registry.ref_count(3).await, Some(2));

    // One widget unmounts; the session stays live for the other.
    registry.release(3).await;
    settle().await;
    assert_ne!(chart.view().status, ConnectionStatus::Closed);

    // Last consumer leaves; the session closes and the store sees the
    // subscription go away.
    registry.release(3).await;
    settle().await;
    assert_eq!(header.view().status, ConnectionStatus::Closed);
    assert_eq!(store.open_subscriptions().await, 0);

    // Coming back builds a fresh session with a fresh bootstrap.
    let back = registry.acquire(3).await;
    settle().await;
    assert_eq!(back.view().latest.unwrap().id, 10);

    registry.release(3).await;
}

#[tokio::test]
async fn test_unreachable_store_degrades_without_failing() {
    let store = Arc::new(MockStore::new());
    store.set_unavailable(true);
    let registry = registry_over(&store, SessionConfig::default());

    // Bootstrap fails end to end; the session degrades instead of erroring.
    let session = registry.acquire(3).await;
    settle().await;
    assert_eq!(session.view().status, ConnectionStatus::Degraded);
    assert!(session.view().latest.is_none());

    registry.release(3).await;
}

#[tokio::test]
async fn test_settings_flow_against_store() {
    let store = Arc::new(MockStore::new());
    let editor = SettingsEditor::new(Arc::clone(&store) as Arc<dyn TelemetryStore>);

    // Missing row yields the documented default, no error.
    let defaults = editor.load(3).await.unwrap();
    assert_eq!(defaults.turn_on_temp, 4.0);
    assert_eq!(defaults.turn_off_temp, 2.0);

    // Invalid input never reaches the store.
    let result = editor
        .save(DeviceSettings {
            turn_on_temp: f64::NAN,
            ..defaults
        })
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(store.write_settings_calls(), 0);

    // A valid save round-trips.
    editor
        .save(DeviceSettings {
            turn_on_temp: 28.0,
            turn_off_temp: 30.0,
            ..defaults
        })
        .await
        .unwrap();
    let loaded = editor.load(3).await.unwrap();
    assert_eq!(loaded.turn_on_temp, 28.0);
    assert_eq!(loaded.turn_off_temp, 30.0);
}
