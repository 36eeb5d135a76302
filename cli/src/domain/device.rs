//! Device domain types.
//!
//! Pure data: what the provisioning service reports about a device and what a
//! caller asks it to create. No I/O.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only device state the lifecycle treats specially.
pub const ACTIVE_STATE: &str = "active";

/// Immutable description of a device to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionRequest {
    pub metro: String,
    pub plan: String,
    pub hostname: String,
    pub operating_system: String,
    /// Boot-time user data. Sent as an empty string when absent.
    pub userdata: String,
}

/// One network address assigned to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub address: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Device details as returned by the provisioning service.
///
/// Fields the lifecycle does not interpret are kept in `extra` so a persisted
/// snapshot round-trips what the service sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDetails {
    pub id: String,
    #[serde(default)]
    pub state: String,
    /// Ordered addresses; the first one is the primary address.
    #[serde(default, rename = "ip_addresses")]
    pub addresses: Vec<IpAddress>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceDetails {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ACTIVE_STATE
    }

    /// First assigned address, if any.
    #[must_use]
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(|a| a.address.as_str())
    }
}

/// Why a poll did not yield a ready device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingReason {
    /// The service reported a non-active state.
    State(String),
    /// The service answered with a status the lifecycle does not interpret.
    UnrecognizedStatus(u16),
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State(state) if state.is_empty() => f.write_str("device state not reported yet"),
            Self::State(state) => write!(f, "device is {state}"),
            Self::UnrecognizedStatus(code) => write!(f, "service answered {code}"),
        }
    }
}

/// Outcome of one readiness poll.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadyState {
    Ready(DeviceDetails),
    Pending(PendingReason),
}

impl ReadyState {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureCreated {
    pub id: String,
    /// `false` when an identifier was already recorded and no request was sent.
    pub created: bool,
}

/// What `stop` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No power-off action is issued against the provisioning service.
    NotSupported,
}
