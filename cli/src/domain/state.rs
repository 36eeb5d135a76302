//! Host-managed device state.
//!
//! The device identifier is the only thing that must survive between
//! invocations; the lifecycle controller never holds it itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::device::DeviceDetails;

/// Device state persisted to `~/.metalctl/state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Identifier returned by create. Empty or absent means not yet requested.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Last fetched details snapshot.
    #[serde(default)]
    pub device: Option<DeviceDetails>,
    /// Primary address once the device is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// The recorded identifier, treating an empty string as absent.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Record a freshly created identifier.
    pub fn set_device_id(&mut self, id: &str) {
        self.device_id = Some(id.to_string());
        self.updated_at = Some(Utc::now());
    }

    /// Record a details snapshot and its primary address.
    pub fn set_details(&mut self, details: DeviceDetails) {
        self.ip = details.primary_address().map(str::to_string);
        self.device = Some(details);
        self.updated_at = Some(Utc::now());
    }

    /// Forget everything about the device after delete.
    pub fn clear(&mut self) {
        self.device_id = None;
        self.device = None;
        self.ip = None;
        self.updated_at = Some(Utc::now());
    }
}
