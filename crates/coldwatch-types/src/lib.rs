//! Shared data types for coldwatch thermal telemetry.
//!
//! This crate provides the plain data types exchanged between the
//! synchronization core and any front end: readings, device settings,
//! device metadata, and the per-device connection status.
//!
//! # Example
//!
//! ```
//! use coldwatch_types::{Reading, ReadingKey};
//! use time::OffsetDateTime;
//!
//! // Readings are totally ordered by (timestamp, id).
//! let reading = Reading {
//!     id: 42,
//!     device_id: 3,
//!     timestamp: OffsetDateTime::now_utc(),
//!     temperature: 4.5,
//!     actuator_on: false,
//! };
//! let key: ReadingKey = reading.key();
//! assert_eq!(key.id, 42);
//! ```

pub mod types;

pub use types::{
    ActuatorKind, CommandKind, ConnectionStatus, DeviceInfo, DeviceSettings, Reading, ReadingKey,
};
