//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Transport errors ──────────────────────────────────────────────────────────

/// A request never produced an HTTP response (DNS, connect, TLS, timeout).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Failures surfaced by the provisioning API client and lifecycle controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Create was rejected. `status` is `None` when no response was received.
    #[error("unable to provision device: {}", describe(.status, .body))]
    Provisioning { status: Option<u16>, body: String },

    #[error("device with id {id} not found")]
    NotFound { id: String },

    #[error("provisioning service not available: {status} - {body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("unable to {action} device: expected {expected}, got {status} - {body}")]
    Action {
        action: DeviceAction,
        expected: u16,
        status: u16,
        body: String,
    },

    #[error("unexpected response from provisioning service: {status} - {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed response from provisioning service: {0}")]
    Decode(String),
}

impl LifecycleError {
    /// Whether the caller may re-invoke the same operation after a delay.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ServiceUnavailable { .. })
    }

    /// Stable machine-readable code used in `--json` error objects.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Provisioning { .. } => "provisioning",
            Self::NotFound { .. } => "not_found",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Action { .. } => "action",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::Decode(_) => "decode",
        }
    }
}

#[allow(clippy::ref_option)]
fn describe(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("{code} - {body}"),
        None => body.to_string(),
    }
}

/// Device actions that expect a specific success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Restart,
    Delete,
}

impl std::fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restart => f.write_str("restart"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

// ── Device state errors ───────────────────────────────────────────────────────

/// Errors about the host-managed device record.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No device recorded. Run 'metalctl device create' first.")]
    NotRequested,

    #[error("Device {0} has no network address yet.")]
    NoAddress(String),
}

// ── Remote session errors ─────────────────────────────────────────────────────

/// Failures of a secure-shell session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid private key: {0}")]
    Key(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("cannot connect: {0}")]
    Connect(String),

    #[error("session failure: {0}")]
    Channel(String),
}

impl SessionError {
    /// Key problems and server-side key rejection both abort the batch as an
    /// authentication failure.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Authentication(_))
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to the configuration bundle.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing '{section}' section in {path}")]
    MissingSection { section: String, path: String },

    #[error("Missing required setting: {key}")]
    MissingKey { key: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
