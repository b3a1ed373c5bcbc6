//! Per-device telemetry synchronization session.
//!
//! A session owns one device's live state: current reading, rolling history
//! window, connection status, and pending-command marker. All mutation runs
//! inside a single spawned actor task, so snapshot application, push-event
//! application, command issuance, and timeout firing never interleave.
//!
//! The reconciliation rule is the core correctness property: an incoming
//! reading replaces `latest` iff its `(timestamp, id)` key is strictly
//! greater than the one currently held. Application is therefore commutative
//! and idempotent, which the store's at-least-once, unordered delivery
//! requires.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coldwatch_types::{CommandKind, ConnectionStatus, Reading};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, SessionEvent};
use crate::history::{HistorySample, HistoryWindow};
use crate::store::{StoreEvent, Subscription, SubscriptionStatus, TelemetryStore};

/// A user-issued control action awaiting confirmation via a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingCommand {
    /// The issued command.
    pub kind: CommandKind,
    /// When it was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

/// Consistent snapshot of a session's observable state.
///
/// Published through a watch channel on every change so a presentation
/// layer can re-render without polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    /// The device this view belongs to.
    pub device_id: i64,
    /// Highest-keyed reading observed so far.
    pub latest: Option<Reading>,
    /// Trend samples, oldest first.
    pub history: Vec<HistorySample>,
    /// Connection status.
    pub status: ConnectionStatus,
    /// Command in flight, if any.
    pub pending_command: Option<PendingCommand>,
}

impl SessionView {
    fn initial(device_id: i64) -> Self {
        Self {
            device_id,
            latest: None,
            history: Vec::new(),
            status: ConnectionStatus::Connecting,
            pending_command: None,
        }
    }

    /// The actuator state to display.
    ///
    /// A pending command wins over the last reported state, so the UI does
    /// not flicker back while the device has not yet reported the commanded
    /// state. Pending commands are removed on timeout, so presence implies
    /// the command is still awaiting confirmation.
    #[must_use]
    pub fn effective_actuator_on(&self) -> Option<bool> {
        if let Some(pending) = &self.pending_command {
            return Some(pending.kind.target_state());
        }
        self.latest.map(|r| r.actuator_on)
    }
}

/// Handle to a running sync session.
///
/// Cheap to clone; all clones observe the same actor. Obtained from
/// [`crate::SessionRegistry::acquire`], or spawned directly for standalone
/// use.
#[derive(Debug, Clone)]
pub struct SyncSession {
    device_id: i64,
    state: watch::Receiver<SessionView>,
    events: EventDispatcher,
    commands: mpsc::Sender<CommandKind>,
}

impl SyncSession {
    /// Spawn a session actor for a device.
    ///
    /// The actor bootstraps by opening the push subscription and fetching
    /// the latest snapshot, then serializes every state mutation until
    /// `cancel` fires. Cancellation aborts an in-flight bootstrap fetch and
    /// closes the subscription; nothing is observable after the final
    /// `Closed` transition.
    pub fn spawn(
        store: Arc<dyn TelemetryStore>,
        device_id: i64,
        config: SessionConfig,
        cancel: CancellationToken,
    ) -> SyncSession {
        let (state_tx, state_rx) = watch::channel(SessionView::initial(device_id));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let events = EventDispatcher::new(config.event_capacity);

        let actor = SessionActor {
            device_id,
            store,
            config,
            latest: None,
            history: HistoryWindow::new(1), // replaced in run() after validation
            status: ConnectionStatus::Connecting,
            pending: None,
            state_tx,
            events: events.clone(),
            cancel,
        };
        tokio::spawn(actor.run(cmd_rx));

        SyncSession {
            device_id,
            state: state_rx,
            events,
            commands: cmd_tx,
        }
    }

    /// The device this session synchronizes.
    #[must_use]
    pub fn device_id(&self) -> i64 {
        self.device_id
    }

    /// Current snapshot of the session state.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.state.borrow().clone()
    }

    /// Watch receiver that resolves whenever the state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.state.clone()
    }

    /// Subscribe to discrete session events.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Issue a control command, fire-and-forget.
    ///
    /// The outcome is observed asynchronously: a confirming reading clears
    /// the pending marker and emits [`SessionEvent::CommandConfirmed`];
    /// otherwise [`SessionEvent::CommandTimedOut`] fires after the
    /// configured timeout.
    pub async fn issue_command(&self, kind: CommandKind) -> Result<()> {
        self.commands
            .send(kind)
            .await
            .map_err(|_| Error::SessionClosed)
    }
}

struct PendingState {
    kind: CommandKind,
    issued_at: OffsetDateTime,
    deadline: Instant,
}

struct SessionActor {
    device_id: i64,
    store: Arc<dyn TelemetryStore>,
    config: SessionConfig,
    latest: Option<Reading>,
    history: HistoryWindow,
    status: ConnectionStatus,
    pending: Option<PendingState>,
    state_tx: watch::Sender<SessionView>,
    events: EventDispatcher,
    cancel: CancellationToken,
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<CommandKind>) {
        let capacity = self.config.history_capacity.max(1);
        self.history = HistoryWindow::new(capacity);
        let cancel = self.cancel.clone();
        let store = Arc::clone(&self.store);

        info!(device_id = self.device_id, "starting sync session");

        // Open the subscription first so pushes queue while the snapshot
        // fetch is in flight; reconciliation absorbs either arrival order.
        let mut subscription: Option<Subscription> = tokio::select! {
            _ = cancel.cancelled() => {
                self.shutdown(None);
                return;
            }
            res = store.subscribe(self.device_id) => match res {
                Ok(sub) => Some(sub),
                Err(e) => {
                    warn!(device_id = self.device_id, error = %e, "subscribe failed");
                    self.set_status(ConnectionStatus::Degraded);
                    None
                }
            }
        };

        let bootstrap = tokio::select! {
            _ = cancel.cancelled() => {
                self.shutdown(subscription);
                return;
            }
            res = store.fetch_latest(self.device_id) => res,
        };
        match bootstrap {
            Ok(Some(reading)) => {
                self.apply_reading(reading);
            }
            Ok(None) => {
                debug!(device_id = self.device_id, "no readings in store yet");
            }
            Err(e) => {
                warn!(device_id = self.device_id, error = %e, "snapshot fetch failed");
                self.set_status(ConnectionStatus::Degraded);
            }
        }

        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);

            enum Step {
                Cancel,
                Command(Option<CommandKind>),
                Push(Option<StoreEvent>),
                Timeout,
            }

            let step = tokio::select! {
                _ = cancel.cancelled() => Step::Cancel,
                cmd = cmd_rx.recv() => Step::Command(cmd),
                event = async {
                    match subscription.as_mut() {
                        Some(sub) => sub.recv().await,
                        None => std::future::pending().await,
                    }
                } => Step::Push(event),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => Step::Timeout,
            };

            match step {
                Step::Cancel => break,
                Step::Command(Some(kind)) => self.handle_command(kind),
                Step::Command(None) => break,
                Step::Push(Some(StoreEvent::Reading(reading))) => {
                    self.apply_reading(reading);
                }
                Step::Push(Some(StoreEvent::Status(status))) => {
                    self.handle_subscription_status(status).await;
                }
                Step::Push(None) => {
                    // Producer went away without a status event.
                    warn!(device_id = self.device_id, "subscription channel ended");
                    subscription = None;
                    self.set_status(ConnectionStatus::Degraded);
                }
                Step::Timeout => self.handle_command_timeout(),
            }
        }

        self.shutdown(subscription);
    }

    fn shutdown(mut self, subscription: Option<Subscription>) {
        if let Some(sub) = subscription {
            sub.close();
        }
        self.status = ConnectionStatus::Closed;
        self.pending = None;
        self.publish();
        self.events.send(SessionEvent::Closed {
            device_id: self.device_id,
        });
        info!(device_id = self.device_id, "sync session closed");
    }

    /// Merge one observed reading into the session state.
    ///
    /// `latest` advances iff the key is strictly greater than the held one;
    /// the history window admits any non-duplicate sample at its key
    /// position, so stale pushes still backfill the trend.
    fn apply_reading(&mut self, reading: Reading) {
        let admitted = self.history.insert(&reading);
        let advances = self
            .latest
            .is_none_or(|held| reading.key() > held.key());

        if advances {
            debug!(
                device_id = self.device_id,
                reading_id = reading.id,
                temperature = reading.temperature,
                "latest advanced"
            );
            self.latest = Some(reading);
            self.events.send(SessionEvent::ReadingApplied {
                device_id: self.device_id,
                reading,
            });
            self.check_confirmation(&reading);
        } else {
            debug!(
                device_id = self.device_id,
                reading_id = reading.id,
                "stale reading, latest unchanged"
            );
        }

        if advances || admitted {
            self.publish();
        }
    }

    // Stale readings predate the command and cannot confirm it, so only an
    // advancing reading is checked against the pending target.
    fn check_confirmation(&mut self, reading: &Reading) {
        let confirmed = self
            .pending
            .as_ref()
            .is_some_and(|p| p.kind.target_state() == reading.actuator_on);
        if confirmed {
            let pending = self.pending.take().expect("pending checked above");
            info!(
                device_id = self.device_id,
                kind = ?pending.kind,
                "command confirmed"
            );
            self.events.send(SessionEvent::CommandConfirmed {
                device_id: self.device_id,
                kind: pending.kind,
            });
        }
    }

    async fn handle_subscription_status(&mut self, status: SubscriptionStatus) {
        match status {
            SubscriptionStatus::Subscribed => {
                let was_live = self.status == ConnectionStatus::Live;
                self.set_status(ConnectionStatus::Live);
                if !was_live {
                    self.heal_gap().await;
                }
            }
            SubscriptionStatus::Error(message) => {
                warn!(
                    device_id = self.device_id,
                    message, "subscription degraded"
                );
                self.set_status(ConnectionStatus::Degraded);
            }
            SubscriptionStatus::Closed => {
                warn!(device_id = self.device_id, "subscription closed by store");
                self.set_status(ConnectionStatus::Degraded);
            }
        }
    }

    /// Close any delivery gap after (re)entering `Live`.
    ///
    /// Always re-fetches the latest reading; when the previously held latest
    /// is older than the gap threshold, also fetches the missed range so the
    /// history window recovers readings lost while disconnected. All results
    /// merge through the reconciliation rule.
    async fn heal_gap(&mut self) {
        let previous = self.latest;

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return,
            res = self.store.fetch_latest(self.device_id) => res,
        };
        match fetched {
            Ok(Some(reading)) => self.apply_reading(reading),
            Ok(None) => {}
            Err(e) => {
                warn!(device_id = self.device_id, error = %e, "gap fetch failed");
                self.set_status(ConnectionStatus::Degraded);
                return;
            }
        }

        let Some(previous) = previous else { return };
        let now = OffsetDateTime::now_utc();
        if now - previous.timestamp <= self.config.gap_threshold {
            return;
        }

        debug!(
            device_id = self.device_id,
            since = %previous.timestamp,
            "backfilling missed range"
        );
        let ranged = tokio::select! {
            _ = self.cancel.cancelled() => return,
            res = self.store.fetch_range(self.device_id, previous.timestamp, now) => res,
        };
        match ranged {
            Ok(readings) => {
                for reading in readings {
                    self.apply_reading(reading);
                }
            }
            Err(e) => {
                warn!(device_id = self.device_id, error = %e, "range backfill failed");
                self.set_status(ConnectionStatus::Degraded);
            }
        }
    }

    fn handle_command(&mut self, kind: CommandKind) {
        // A new command invalidates the prior single-shot timer.
        if let Some(old) = self.pending.take() {
            debug!(
                device_id = self.device_id,
                kind = ?old.kind,
                "pending command superseded"
            );
            self.events.send(SessionEvent::CommandSuperseded {
                device_id: self.device_id,
                kind: old.kind,
            });
        }

        info!(device_id = self.device_id, kind = ?kind, "command issued");
        self.pending = Some(PendingState {
            kind,
            issued_at: OffsetDateTime::now_utc(),
            deadline: Instant::now() + self.config.command_timeout,
        });
        self.publish();
    }

    fn handle_command_timeout(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        warn!(
            device_id = self.device_id,
            kind = ?pending.kind,
            "command timed out without confirmation"
        );
        self.events.send(SessionEvent::CommandTimedOut {
            device_id: self.device_id,
            kind: pending.kind,
        });
        self.publish();
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        debug!(device_id = self.device_id, from = %self.status, to = %status, "status change");
        self.status = status;
        self.events.send(SessionEvent::StatusChanged {
            device_id: self.device_id,
            status,
        });
        self.publish();
    }

    fn publish(&mut self) {
        let view = SessionView {
            device_id: self.device_id,
            latest: self.latest,
            history: self.history.to_vec(),
            status: self.status,
            pending_command: self.pending.as_ref().map(|p| PendingCommand {
                kind: p.kind,
                issued_at: p.issued_at,
            }),
        };
        self.state_tx.send_replace(view);
    }
}
