//! Session configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for per-device sync sessions.
///
/// Use the builder-style setters for convenient construction:
///
/// ```
/// use std::time::Duration;
/// use coldwatch_core::SessionConfig;
///
/// let config = SessionConfig::default()
///     .history_capacity(144)
///     .command_timeout(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the rolling history window.
    /// Default: 288 samples (one day at a 5-minute report cadence).
    pub history_capacity: usize,
    /// How long a pending command waits for a confirming reading before it
    /// is reported as timed out. Default: 15 seconds.
    pub command_timeout: Duration,
    /// On reconnect, if the previous latest reading is older than this, the
    /// gap is backfilled with a range fetch. Default: 5 minutes.
    pub gap_threshold: Duration,
    /// Capacity of the session event broadcast channel. Default: 100.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 288,
            command_timeout: Duration::from_secs(15),
            gap_threshold: Duration::from_secs(300),
            event_capacity: 100,
        }
    }
}

impl SessionConfig {
    /// Set the history window capacity.
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the pending-command timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the reconnect gap-backfill threshold.
    #[must_use]
    pub fn gap_threshold(mut self, threshold: Duration) -> Self {
        self.gap_threshold = threshold;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// Checks that:
    /// - `history_capacity` is > 0
    /// - `command_timeout` is > 0
    /// - `event_capacity` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::invalid_config("history_capacity must be > 0"));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::invalid_config("command_timeout must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        Ok(())
    }
}
