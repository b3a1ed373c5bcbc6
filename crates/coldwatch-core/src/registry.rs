//! Process-wide registry of per-device sync sessions.
//!
//! Maps device id to its running [`SyncSession`] with an explicit
//! reference-counted lifecycle: create on first view, dispose when the last
//! consumer releases. The store client is an explicit constructor dependency
//! so tests can substitute [`crate::mock::MockStore`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coldwatch_types::CommandKind;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::session::SyncSession;
use crate::store::TelemetryStore;

struct SessionEntry {
    session: SyncSession,
    cancel: CancellationToken,
    ref_count: usize,
}

/// Registry owning every live sync session.
///
/// The map lock guards insert/remove and refcounting only; sessions are
/// otherwise independent actors.
pub struct SessionRegistry {
    store: Arc<dyn TelemetryStore>,
    config: SessionConfig,
    sessions: Mutex<HashMap<i64, SessionEntry>>,
}

impl SessionRegistry {
    /// Create a registry over the given store client.
    ///
    /// Fails with [`Error::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(store: Arc<dyn TelemetryStore>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Acquire the session for a device, creating it on first acquisition.
    ///
    /// Idempotent under concurrent acquisition: the map lock is held across
    /// the lookup-or-spawn, so at most one bootstrap runs per device.
    pub async fn acquire(&self, device_id: i64) -> SyncSession {
        let mut sessions = self.sessions.lock().await;

        if let Some(entry) = sessions.get_mut(&device_id) {
            entry.ref_count += 1;
            debug!(device_id, ref_count = entry.ref_count, "session acquired");
            return entry.session.clone();
        }

        info!(device_id, "creating sync session");
        let cancel = CancellationToken::new();
        let session = SyncSession::spawn(
            Arc::clone(&self.store),
            device_id,
            self.config.clone(),
            cancel.clone(),
        );
        sessions.insert(
            device_id,
            SessionEntry {
                session: session.clone(),
                cancel,
                ref_count: 1,
            },
        );
        session
    }

    /// Release one reference to a device's session.
    ///
    /// At zero references the session is disposed: its subscription closes,
    /// any in-flight bootstrap fetch is cancelled, and no further state
    /// mutation or notification fires beyond the terminal `Closed`
    /// transition.
    pub async fn release(&self, device_id: i64) {
        let mut sessions = self.sessions.lock().await;

        let Some(entry) = sessions.get_mut(&device_id) else {
            warn!(device_id, "release for unknown session");
            return;
        };

        entry.ref_count -= 1;
        debug!(device_id, ref_count = entry.ref_count, "session released");
        if entry.ref_count == 0 {
            let entry = sessions.remove(&device_id).expect("entry present");
            entry.cancel.cancel();
            info!(device_id, "disposing sync session");
        }
    }

    /// Issue a control command to a device's live session.
    ///
    /// Fire-and-forget from the caller's perspective; the outcome is
    /// observed asynchronously through the session's state and events.
    /// Fails with [`Error::SessionClosed`] if no session is live for the
    /// device.
    pub async fn issue_command(&self, device_id: i64, kind: CommandKind) -> Result<()> {
        let session = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&device_id)
                .map(|entry| entry.session.clone())
                .ok_or(Error::SessionClosed)?
        };
        session.issue_command(kind).await
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Reference count for a device's session, if one is live.
    pub async fn ref_count(&self, device_id: i64) -> Option<usize> {
        self.sessions
            .lock()
            .await
            .get(&device_id)
            .map(|entry| entry.ref_count)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish()
    }
}
