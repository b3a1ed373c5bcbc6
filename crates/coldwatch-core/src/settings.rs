//! Device settings read/write.
//!
//! A thin read/modify/write surface over the store's settings records.
//! There is no relation to the live reading stream and no optimistic merge:
//! concurrent edits are last-writer-wins, matching the store's upsert.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use coldwatch_types::DeviceSettings;

use crate::error::{Error, Result};
use crate::store::TelemetryStore;

/// Editor for per-device automation thresholds.
#[derive(Clone)]
pub struct SettingsEditor {
    store: Arc<dyn TelemetryStore>,
}

impl SettingsEditor {
    /// Create an editor over the given store client.
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Load a device's settings.
    ///
    /// A device with no settings row is not an error: the documented
    /// default record ([`DeviceSettings::default_for`]) is returned.
    /// Store errors propagate, as this is a user-initiated read.
    pub async fn load(&self, device_id: i64) -> Result<DeviceSettings> {
        match self.store.read_settings(device_id).await? {
            Some(settings) => Ok(settings),
            None => {
                info!(device_id, "no settings row, returning default");
                Ok(DeviceSettings::default_for(device_id))
            }
        }
    }

    /// Validate and upsert a device's settings, stamping `updated_at`.
    ///
    /// Fails with [`Error::Validation`] before any store call when either
    /// threshold is not a finite number. No cross-field ordering is
    /// imposed: which threshold must exceed which depends on whether the
    /// device heats or cools, and that is the firmware's concern.
    pub async fn save(&self, settings: DeviceSettings) -> Result<DeviceSettings> {
        validate_thresholds(&settings)?;

        let stamped = DeviceSettings {
            updated_at: OffsetDateTime::now_utc(),
            ..settings
        };
        self.store.write_settings(&stamped).await?;
        info!(
            device_id = stamped.device_id,
            turn_on_temp = stamped.turn_on_temp,
            turn_off_temp = stamped.turn_off_temp,
            "settings saved"
        );
        Ok(stamped)
    }
}

impl std::fmt::Debug for SettingsEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsEditor").finish()
    }
}

fn validate_thresholds(settings: &DeviceSettings) -> Result<()> {
    if !settings.turn_on_temp.is_finite() {
        return Err(Error::validation("turn_on_temp is not a finite number"));
    }
    if !settings.turn_off_temp.is_finite() {
        return Err(Error::validation("turn_off_temp is not a finite number"));
    }
    Ok(())
}
