//! Read-only device metadata registry.
//!
//! Static or slowly-changing mapping from device id to its descriptive
//! metadata. The synchronization core never mutates it; an unknown id is
//! not an error for a session, only a gap in display metadata.

use std::collections::HashMap;

use coldwatch_types::DeviceInfo;

/// Fleet metadata lookup.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<i64, DeviceInfo>,
}

impl DeviceRegistry {
    /// Build a registry from a seed list.
    ///
    /// Later entries with a duplicate id replace earlier ones.
    #[must_use]
    pub fn new(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Metadata for a device, if known.
    #[must_use]
    pub fn get(&self, device_id: i64) -> Option<&DeviceInfo> {
        self.devices.get(&device_id)
    }

    /// Whether the fleet contains a device.
    #[must_use]
    pub fn contains(&self, device_id: i64) -> bool {
        self.devices.contains_key(&device_id)
    }

    /// Display name for a device, falling back to the numeric id.
    #[must_use]
    pub fn display_name(&self, device_id: i64) -> String {
        self.get(device_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("device {device_id}"))
    }

    /// Iterate all known devices in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.values()
    }

    /// Number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the fleet is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
