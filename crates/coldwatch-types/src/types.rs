//! Core types for coldwatch telemetry data.

use core::fmt;

use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of actuator a device drives.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new actuator
/// kinds in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum ActuatorKind {
    /// Refrigeration compressor (cooling device).
    Compressor,
    /// Heating element (heating device).
    Heater,
    /// Recirculation pump.
    Pump,
}

impl ActuatorKind {
    /// Human-readable label for this actuator kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ActuatorKind::Compressor => "Compressor",
            ActuatorKind::Heater => "Heating element",
            ActuatorKind::Pump => "Recirculation pump",
        }
    }

    /// Whether this actuator cools rather than heats.
    ///
    /// Cooling devices arm at a *higher* temperature than they disarm;
    /// heating devices do the reverse. The core does not act on this, it
    /// only carries the distinction for display.
    #[must_use]
    pub fn is_cooling(&self) -> bool {
        matches!(self, ActuatorKind::Compressor | ActuatorKind::Pump)
    }
}

impl fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One timestamped temperature + actuator-state sample reported by a device.
///
/// Readings are immutable facts. Identity is `id` (store-assigned,
/// monotonic with insertion); two readings with the same `id` are the same
/// fact. Ordering is by [`ReadingKey`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Store-assigned row id, monotonic with insertion.
    pub id: i64,
    /// The device that reported this sample.
    pub device_id: i64,
    /// When the sample was captured.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Whether the actuator was on when the sample was taken.
    pub actuator_on: bool,
}

impl Reading {
    /// The total-order key for this reading.
    #[must_use]
    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            timestamp: self.timestamp,
            id: self.id,
        }
    }
}

/// `(timestamp, id)` lexicographic key totally ordering readings.
///
/// Timestamp resolution can collide; store-assigned ids are monotonic
/// with insertion, so the id tie-break yields a safe total order.
///
/// # Example
///
/// ```
/// use coldwatch_types::ReadingKey;
/// use time::OffsetDateTime;
///
/// let t = OffsetDateTime::from_unix_timestamp(100).unwrap();
/// let a = ReadingKey { timestamp: t, id: 9 };
/// let b = ReadingKey { timestamp: t, id: 10 };
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReadingKey {
    /// Capture timestamp (primary ordering).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Store-assigned id (tie-break for equal timestamps).
    pub id: i64,
}

/// Per-device automation thresholds, one logical record per device.
///
/// No ordering invariant is enforced between the two thresholds: which
/// must exceed which depends on whether the device heats or cools, and
/// that interpretation belongs to the device firmware.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceSettings {
    /// Unique key; the settings record is an upsert on this id.
    pub device_id: i64,
    /// Temperature at which the firmware turns the actuator on.
    pub turn_on_temp: f64,
    /// Temperature at which the firmware turns the actuator off.
    pub turn_off_temp: f64,
    /// Last write time, stamped by the writer.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub updated_at: OffsetDateTime,
}

impl DeviceSettings {
    /// The hard-coded default record for a device with no settings row.
    ///
    /// Arms at 4.0 °C and disarms at 2.0 °C, a safe cooling-side default.
    /// A device with no settings row is not an error.
    #[must_use]
    pub fn default_for(device_id: i64) -> Self {
        Self {
            device_id,
            turn_on_temp: 4.0,
            turn_off_temp: 2.0,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Descriptive metadata for one device in the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceInfo {
    /// Device identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// What the device actuates.
    pub kind: ActuatorKind,
}

/// A user-issued control action awaiting device confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandKind {
    /// Drive the actuator to the given on/off state.
    SetActuator {
        /// The commanded state.
        on: bool,
    },
}

impl CommandKind {
    /// The actuator state a confirming reading must report.
    #[must_use]
    pub fn target_state(&self) -> bool {
        match self {
            CommandKind::SetActuator { on } => *on,
        }
    }
}

/// Connection status of a per-device sync session.
///
/// `Closed` is terminal; a device with permanent connectivity loss stays
/// `Degraded` forever rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionStatus {
    /// Bootstrap in progress, subscription not yet confirmed.
    Connecting,
    /// Subscription confirmed, push events flowing.
    Live,
    /// Subscription reported an error; last-known-good state stays visible.
    Degraded,
    /// Session disposed.
    Closed,
}

impl ConnectionStatus {
    /// Whether the device should be shown as online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionStatus::Live)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Live => "live",
            ConnectionStatus::Degraded => "degraded",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).unwrap()
    }

    #[test]
    fn test_key_orders_by_timestamp_first() {
        let a = ReadingKey {
            timestamp: ts(100),
            id: 50,
        };
        let b = ReadingKey {
            timestamp: ts(101),
            id: 1,
        };
        assert!(a < b);
    }

    #[test]
    fn test_key_tie_breaks_on_id() {
        let a = ReadingKey {
            timestamp: ts(100),
            id: 9,
        };
        let b = ReadingKey {
            timestamp: ts(100),
            id: 10,
        };
        assert!(a < b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_reading_key_accessor() {
        let reading = Reading {
            id: 10,
            device_id: 3,
            timestamp: ts(100),
            temperature: 5.0,
            actuator_on: false,
        };
        assert_eq!(reading.key().id, 10);
        assert_eq!(reading.key().timestamp, ts(100));
    }

    #[test]
    fn test_default_settings() {
        let settings = DeviceSettings::default_for(7);
        assert_eq!(settings.device_id, 7);
        assert_eq!(settings.turn_on_temp, 4.0);
        assert_eq!(settings.turn_off_temp, 2.0);
    }

    #[test]
    fn test_actuator_labels() {
        assert_eq!(ActuatorKind::Compressor.label(), "Compressor");
        assert_eq!(ActuatorKind::Heater.label(), "Heating element");
        assert!(ActuatorKind::Compressor.is_cooling());
        assert!(!ActuatorKind::Heater.is_cooling());
    }

    #[test]
    fn test_command_target_state() {
        assert!(CommandKind::SetActuator { on: true }.target_state());
        assert!(!CommandKind::SetActuator { on: false }.target_state());
    }

    #[test]
    fn test_status_online() {
        assert!(ConnectionStatus::Live.is_online());
        assert!(!ConnectionStatus::Connecting.is_online());
        assert!(!ConnectionStatus::Degraded.is_online());
        assert_eq!(ConnectionStatus::Degraded.to_string(), "degraded");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serde_round_trip() {
        let reading = Reading {
            id: 42,
            device_id: 3,
            timestamp: ts(1_700_000_000),
            temperature: 4.5,
            actuator_on: true,
        };
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"device_id\":3"));
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }
}
