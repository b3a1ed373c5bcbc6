//! Telemetry synchronization core for coldwatch thermal fleets.
//!
//! This crate reconciles, per device, a point-in-time snapshot from the
//! telemetry store with a live stream of push notifications, maintains a
//! bounded in-memory history window, derives connection status, and exposes
//! a consistent, race-free view to the presentation layer while a control
//! action is in flight.
//!
//! # Features
//!
//! - **Sync sessions**: one single-owner actor per device, applying every
//!   reading through a commutative, idempotent reconciliation rule
//! - **History window**: bounded, ordered trend buffer with out-of-order
//!   insertion and duplicate dropping
//! - **Session registry**: reference-counted create-on-first-view,
//!   dispose-on-last-release lifecycle
//! - **Optimistic commands**: pending-command marker with confirmation by
//!   reading or explicit timeout, never a silent drop
//! - **Gap healing**: snapshot and range re-fetch on every reconnect
//! - **Settings editor**: validated threshold read/modify/write
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use coldwatch_core::{SessionConfig, SessionRegistry, TelemetryStore};
//! use coldwatch_types::CommandKind;
//!
//! # async fn example(store: Arc<dyn TelemetryStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SessionRegistry::new(store, SessionConfig::default())?;
//!
//! // Acquire a session when a device comes into view
//! let session = registry.acquire(3).await;
//! let mut state = session.watch();
//!
//! // Toggle the actuator; the outcome arrives through the state
//! session.issue_command(CommandKind::SetActuator { on: true }).await?;
//!
//! while state.changed().await.is_ok() {
//!     let view = state.borrow().clone();
//!     println!("{:?} {:?}", view.status, view.effective_actuator_on());
//! }
//!
//! // Release when navigating away
//! registry.release(3).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod history;
pub mod mock;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;

// Re-export types for downstream convenience
pub use coldwatch_types as types;

// Core exports
pub use config::SessionConfig;
pub use devices::DeviceRegistry;
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, SessionEvent};
pub use history::{HistorySample, HistoryWindow};
pub use mock::MockStore;
pub use registry::SessionRegistry;
pub use session::{PendingCommand, SessionView, SyncSession};
pub use settings::SettingsEditor;
pub use store::{StoreEvent, Subscription, SubscriptionStatus, TelemetryStore};

// Re-export from coldwatch-types
pub use coldwatch_types::{
    ActuatorKind, CommandKind, ConnectionStatus, DeviceInfo, DeviceSettings, Reading, ReadingKey,
};

/// Type alias for a shared store client reference.
///
/// The store client is threaded through the registry and editors as an
/// explicit dependency rather than a global singleton, so tests can
/// substitute a [`MockStore`] with controllable fetch/push timing.
pub type SharedStore = std::sync::Arc<dyn TelemetryStore>;
