//! Mock telemetry store for testing.
//!
//! Implements [`TelemetryStore`] without a real backing store, so the
//! synchronization core can be exercised with controllable fetch/push
//! timing.
//!
//! # Features
//!
//! - **Seeded data**: preload readings and settings per device
//! - **Push injection**: deliver readings and status transitions on demand,
//!   including duplicates and out-of-order events
//! - **Failure injection**: make calls fail transiently or permanently
//! - **Call counters**: assert which store operations were attempted

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use coldwatch_types::{DeviceSettings, Reading};

use crate::error::{Error, Result};
use crate::store::{StoreEvent, Subscription, SubscriptionStatus, TelemetryStore};

struct MockSubscriber {
    device_id: i64,
    sender: mpsc::Sender<StoreEvent>,
    cancel: CancellationToken,
}

/// An in-memory [`TelemetryStore`] with controllable behavior.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use coldwatch_core::mock::MockStore;
/// use coldwatch_core::TelemetryStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = Arc::new(MockStore::new());
///     assert_eq!(store.fetch_latest(1).await.unwrap(), None);
/// }
/// ```
#[derive(Default)]
pub struct MockStore {
    /// Readings per device, ascending by ordering key.
    readings: RwLock<HashMap<i64, Vec<Reading>>>,
    settings: RwLock<HashMap<i64, DeviceSettings>>,
    subscribers: RwLock<Vec<MockSubscriber>>,
    unavailable: AtomicBool,
    /// Number of calls to fail before succeeding again.
    remaining_failures: AtomicU32,
    fetch_latest_calls: AtomicU32,
    fetch_range_calls: AtomicU32,
    read_settings_calls: AtomicU32,
    write_settings_calls: AtomicU32,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a reading without delivering it to subscribers.
    pub async fn seed_reading(&self, reading: Reading) {
        let mut readings = self.readings.write().await;
        let rows = readings.entry(reading.device_id).or_default();
        let idx = rows.partition_point(|r| r.key() < reading.key());
        rows.insert(idx, reading);
    }

    /// Preload a settings record.
    pub async fn seed_settings(&self, settings: DeviceSettings) {
        self.settings
            .write()
            .await
            .insert(settings.device_id, settings);
    }

    /// Store a reading and deliver it to the device's subscribers, like a
    /// real insert would.
    pub async fn insert_reading(&self, reading: Reading) {
        self.seed_reading(reading).await;
        self.push_reading(reading).await;
    }

    /// Deliver a reading to the device's subscribers without storing it.
    ///
    /// Useful for simulating at-least-once delivery: duplicates and stale
    /// events are delivered exactly as passed.
    pub async fn push_reading(&self, reading: Reading) {
        self.broadcast(reading.device_id, StoreEvent::Reading(reading))
            .await;
    }

    /// Deliver a status transition to every open subscription.
    pub async fn push_status(&self, status: SubscriptionStatus) {
        let subscribers = self.subscribers.read().await;
        for sub in subscribers.iter() {
            if !sub.cancel.is_cancelled() {
                let _ = sub.sender.send(StoreEvent::Status(status.clone())).await;
            }
        }
    }

    /// Make every call fail with `StoreUnavailable` until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Make the next `count` calls fail transiently.
    pub fn fail_next(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of `fetch_latest` calls made.
    pub fn fetch_latest_calls(&self) -> u32 {
        self.fetch_latest_calls.load(Ordering::Relaxed)
    }

    /// Number of `fetch_range` calls made.
    pub fn fetch_range_calls(&self) -> u32 {
        self.fetch_range_calls.load(Ordering::Relaxed)
    }

    /// Number of `read_settings` calls made.
    pub fn read_settings_calls(&self) -> u32 {
        self.read_settings_calls.load(Ordering::Relaxed)
    }

    /// Number of `write_settings` calls made.
    pub fn write_settings_calls(&self) -> u32 {
        self.write_settings_calls.load(Ordering::Relaxed)
    }

    /// Number of subscriptions that are still open.
    pub async fn open_subscriptions(&self) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers
            .iter()
            .filter(|s| !s.cancel.is_cancelled())
            .count()
    }

    async fn broadcast(&self, device_id: i64, event: StoreEvent) {
        let subscribers = self.subscribers.read().await;
        for sub in subscribers.iter() {
            if sub.device_id == device_id && !sub.cancel.is_cancelled() {
                let _ = sub.sender.send(event.clone()).await;
            }
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::store_unavailable("injected transient failure"));
        }
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(Error::store_unavailable("store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for MockStore {
    async fn fetch_latest(&self, device_id: i64) -> Result<Option<Reading>> {
        self.fetch_latest_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let readings = self.readings.read().await;
        Ok(readings.get(&device_id).and_then(|rows| rows.last().copied()))
    }

    async fn fetch_range(
        &self,
        device_id: i64,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Reading>> {
        self.fetch_range_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let readings = self.readings.read().await;
        Ok(readings
            .get(&device_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.timestamp >= from && r.timestamp <= to)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, device_id: i64) -> Result<Subscription> {
        self.check_available()?;
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        debug!(device_id, "mock subscription opened");
        // Confirm immediately, like a store client that acks its own
        // subscribe request. Later transitions come from `push_status`.
        let _ = tx
            .send(StoreEvent::Status(SubscriptionStatus::Subscribed))
            .await;
        self.subscribers.write().await.push(MockSubscriber {
            device_id,
            sender: tx,
            cancel: cancel.clone(),
        });
        Ok(Subscription::new(rx, cancel))
    }

    async fn read_settings(&self, device_id: i64) -> Result<Option<DeviceSettings>> {
        self.read_settings_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.settings.read().await.get(&device_id).copied())
    }

    async fn write_settings(&self, settings: &DeviceSettings) -> Result<()> {
        self.write_settings_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.settings
            .write()
            .await
            .insert(settings.device_id, *settings);
        Ok(())
    }
}
