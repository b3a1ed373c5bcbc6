//! Session event system for state-change notifications.
//!
//! Sync sessions push discrete notifications through a broadcast channel so
//! a presentation layer can re-render without polling and without assuming
//! any particular rendering framework.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use coldwatch_types::{CommandKind, ConnectionStatus, Reading};

/// Events emitted by a sync session.
///
/// All events are serializable for logging, persistence, and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The connection status changed.
    StatusChanged {
        device_id: i64,
        status: ConnectionStatus,
    },
    /// A reading advanced the session's latest state.
    ReadingApplied { device_id: i64, reading: Reading },
    /// A pending command was confirmed by a matching reading.
    CommandConfirmed { device_id: i64, kind: CommandKind },
    /// A pending command timed out without confirmation.
    ///
    /// Distinct from a store error: the store stayed reachable, the device
    /// simply never reported the commanded state.
    CommandTimedOut { device_id: i64, kind: CommandKind },
    /// A pending command was replaced by a newer one before resolving.
    CommandSuperseded { device_id: i64, kind: CommandKind },
    /// The session was disposed. Nothing fires after this.
    Closed { device_id: i64 },
}

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_delivers_to_subscriber() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        dispatcher.send(SessionEvent::Closed { device_id: 3 });

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Closed { device_id: 3 });
    }

    #[test]
    fn test_send_without_receivers_is_ok() {
        let dispatcher = EventDispatcher::new(8);
        dispatcher.send(SessionEvent::StatusChanged {
            device_id: 1,
            status: ConnectionStatus::Degraded,
        });
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::CommandTimedOut {
            device_id: 3,
            kind: CommandKind::SetActuator { on: true },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"command_timed_out\""));
        assert!(json.contains("\"device_id\":3"));
    }
}
