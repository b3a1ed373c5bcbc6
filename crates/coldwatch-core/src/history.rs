//! Bounded, ordered history of temperature samples.
//!
//! The window is derived from the stream of accepted readings and is used
//! only for display trending; it is never consulted to reconstruct the
//! session's latest reading.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use coldwatch_types::{Reading, ReadingKey};

/// One `(timestamp, temperature)` trend sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Ordering key of the reading this sample came from.
    pub key: ReadingKey,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
}

impl HistorySample {
    /// Capture time of the sample.
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.key.timestamp
    }
}

/// Fixed-capacity window of samples ordered by [`ReadingKey`].
///
/// Inserts land at their key position even when they arrive out of order
/// relative to the tail; duplicates by reading id are dropped. When full,
/// the window holds exactly the top-capacity samples by key: the smallest
/// key is evicted to admit a larger one, and samples below the current
/// window floor are rejected.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    capacity: usize,
    samples: VecDeque<HistorySample>,
}

impl HistoryWindow {
    /// Create an empty window with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; [`crate::SessionConfig::validate`]
    /// rejects that before a window is ever built.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be > 0");
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert a reading's sample at its key position.
    ///
    /// Returns `true` if the sample was admitted, `false` if it was a
    /// duplicate or fell below a full window's floor.
    pub fn insert(&mut self, reading: &Reading) -> bool {
        // Identity is the reading id, regardless of key.
        if self.samples.iter().any(|s| s.key.id == reading.id) {
            return false;
        }

        let key = reading.key();
        if self.samples.len() == self.capacity {
            match self.samples.front() {
                Some(floor) if key < floor.key => return false,
                _ => {
                    self.samples.pop_front();
                }
            }
        }

        let idx = self.samples.partition_point(|s| s.key < key);
        self.samples.insert(
            idx,
            HistorySample {
                key,
                temperature: reading.temperature,
            },
        );
        true
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The window's fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    /// Clone the samples into a plain vector, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<HistorySample> {
        self.samples.iter().copied().collect()
    }
}
