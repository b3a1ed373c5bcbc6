//! Example: Watching a Device Session
//!
//! This example runs a sync session against the in-memory mock store,
//! injects readings and a connection drop, issues an actuator command,
//! and prints the session view after each step.
//!
//! Run with: `cargo run --example watch_device`

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use coldwatch_core::mock::MockStore;
use coldwatch_core::{
    CommandKind, Reading, SessionConfig, SessionRegistry, SessionView, SubscriptionStatus,
    TelemetryStore,
};

fn reading(id: i64, temperature: f64, actuator_on: bool) -> Reading {
    Reading {
        id,
        device_id: 1,
        timestamp: OffsetDateTime::now_utc(),
        temperature,
        actuator_on,
    }
}

fn print_view(label: &str, view: &SessionView) {
    println!("{label}:");
    println!("  Status:   {}", view.status);
    match view.latest {
        Some(latest) => println!(
            "  Latest:   {:.1} °C (actuator {})",
            latest.temperature,
            if latest.actuator_on { "on" } else { "off" }
        ),
        None => println!("  Latest:   none"),
    }
    println!("  History:  {} samples", view.history.len());
    println!("  Shown as: actuator {:?}", view.effective_actuator_on());
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let store = Arc::new(MockStore::new());
    store.seed_reading(reading(1, 5.2, false)).await;

    let registry = SessionRegistry::new(
        Arc::clone(&store) as Arc<dyn TelemetryStore>,
        SessionConfig::default().command_timeout(Duration::from_secs(2)),
    )?;

    let session = registry.acquire(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("After bootstrap", &session.view());

    // The device reports a fresh sample.
    store.insert_reading(reading(2, 4.9, false)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("After a push", &session.view());

    // The subscription drops and recovers; the session heals the gap.
    store
        .push_status(SubscriptionStatus::Error("simulated drop".into()))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("After a transport drop", &session.view());

    store.push_status(SubscriptionStatus::Subscribed).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("After recovery", &session.view());

    // Command the compressor on; the view flips optimistically.
    registry
        .issue_command(1, CommandKind::SetActuator { on: true })
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("Command pending", &session.view());

    // The device confirms by reporting the commanded state.
    store.insert_reading(reading(3, 4.5, true)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("Command confirmed", &session.view());

    registry.release(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_view("After release", &session.view());

    Ok(())
}
