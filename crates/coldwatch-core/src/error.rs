//! Error types for coldwatch-core.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::StoreUnavailable`] | Retry, or let the session degrade | Transient transport failure |
//! | [`Error::Validation`] | Do not retry | Caller input is wrong, fix and resubmit |
//! | [`Error::CommandTimeout`] | Reissue if still wanted | Device never confirmed the command |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//! | [`Error::SessionClosed`] | Acquire a new session | The session was disposed |
//! | [`Error::Cancelled`] | Do not retry | Operation was intentionally cancelled |
//!
//! Transport failures inside a sync session are never surfaced as errors:
//! the session transitions to `Degraded` and keeps its last-known-good state
//! visible. Only user-initiated calls (settings save, a direct fetch)
//! propagate `StoreUnavailable` to their caller.

use thiserror::Error;

use coldwatch_types::CommandKind;

/// Errors that can occur in the coldwatch synchronization core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The telemetry store could not be reached. Transient and retryable.
    #[error("Telemetry store unavailable: {message}")]
    StoreUnavailable {
        /// Transport-level detail.
        message: String,
    },

    /// Caller input failed validation. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A control command was issued but never confirmed by a reading.
    #[error("Command {kind:?} for device {device_id} timed out without confirmation")]
    CommandTimeout {
        /// The device the command was issued to.
        device_id: i64,
        /// The command that went unconfirmed.
        kind: CommandKind,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation attempted on a disposed session.
    #[error("Session is closed")]
    SessionClosed,

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error is transient and worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable { .. })
    }
}

/// Result type alias using coldwatch-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
