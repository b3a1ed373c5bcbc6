//! Telemetry store client contract.
//!
//! The backing store is an external collaborator reached over an unreliable
//! transport: every call can fail or time out, and push delivery is
//! at-least-once with no ordering guarantee relative to concurrent fetches.
//! The [`TelemetryStore`] trait abstracts it so the synchronization core can
//! run against a real store or [`crate::mock::MockStore`] in tests.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use coldwatch_types::{DeviceSettings, Reading};

use crate::error::Result;

/// Status of a push subscription, reported by the store client.
///
/// Reconnection backoff is the store client's concern; the session only
/// reacts to these transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// The subscription is confirmed and delivering.
    Subscribed,
    /// The subscription hit a transport error and may have dropped events.
    Error(String),
    /// The subscription was closed by the store.
    Closed,
}

/// One item delivered by a push subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A newly inserted reading. May be delivered more than once.
    Reading(Reading),
    /// A subscription status transition.
    Status(SubscriptionStatus),
}

/// Abstraction over the telemetry store's query and realtime-push surface.
///
/// All transport failures map to [`crate::Error::StoreUnavailable`] and are
/// retried by the caller, never internally.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Latest reading for a device, if the device has ever reported.
    async fn fetch_latest(&self, device_id: i64) -> Result<Option<Reading>>;

    /// Readings for a device in `[from, to]`, ascending by capture time.
    async fn fetch_range(
        &self,
        device_id: i64,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Reading>>;

    /// Open a push subscription delivering newly inserted readings for a
    /// device as they are created, at-least-once and unordered relative to
    /// concurrent fetches.
    async fn subscribe(&self, device_id: i64) -> Result<Subscription>;

    /// Read the per-device settings record, if one exists.
    async fn read_settings(&self, device_id: i64) -> Result<Option<DeviceSettings>>;

    /// Upsert the settings record keyed by `device_id`. Last-writer-wins,
    /// no optimistic concurrency token.
    async fn write_settings(&self, settings: &DeviceSettings) -> Result<()>;
}

/// Handle to an open push subscription.
///
/// Events arrive on an internal channel; the store-side producer must
/// enqueue-and-return, never block. Dropping the handle cancels the
/// subscription, so no event is delivered after disposal.
pub struct Subscription {
    receiver: mpsc::Receiver<StoreEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Wrap a channel and cancellation token into a subscription handle.
    ///
    /// Store implementations hand the sender half to their delivery task and
    /// stop delivering once `cancel` fires.
    pub fn new(receiver: mpsc::Receiver<StoreEvent>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Receive the next event, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.receiver.recv().await
    }

    /// Close the subscription, signalling the store-side producer to stop.
    pub fn close(self) {
        self.cancel.cancel();
    }

    /// Token the store-side producer watches for cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // A dropped handle must not leave the producer delivering into the void.
        self.cancel.cancel();
    }
}

impl Stream for Subscription {
    type Item = StoreEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_events() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = Subscription::new(rx, CancellationToken::new());

        tx.send(StoreEvent::Status(SubscriptionStatus::Subscribed))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(
            sub.recv().await,
            Some(StoreEvent::Status(SubscriptionStatus::Subscribed))
        );
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_subscription_cancels_on_drop() {
        let (_tx, rx) = mpsc::channel::<StoreEvent>(1);
        let token = CancellationToken::new();
        let sub = Subscription::new(rx, token.clone());

        assert!(!token.is_cancelled());
        drop(sub);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_store_event_serialization() {
        let event = StoreEvent::Status(SubscriptionStatus::Error("socket reset".into()));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("socket reset"));
    }
}
