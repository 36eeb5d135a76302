//! Domain types and validators for the metalctl configuration bundle.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::device::ProvisionRequest;
use crate::domain::error::ConfigError;
use crate::domain::ssh::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SSH_PORT, HostKeyPolicy, SshTarget,
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Public Equinix Metal API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.equinix.com/metal/v1";

/// Delay a scheduler should wait before re-invoking a pending operation.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.metalctl/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetalctlConfig {
    /// Provisioning settings.
    pub metal: Option<MetalConfig>,
    /// Remote execution settings.
    pub ssh: Option<SshConfig>,
}

/// Provisioning service credentials and the device to request.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetalConfig {
    pub project_id: String,
    pub api_key: String,
    pub hostname: String,
    pub plan: String,
    pub metro: String,
    pub operating_system: String,
    pub userdata: String,
    /// Base URL of the provisioning API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Seconds between readiness polls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl std::fmt::Debug for MetalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("plan", &self.plan)
            .field("metro", &self.metro)
            .field("operating_system", &self.operating_system)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl MetalConfig {
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_URL)
    }

    #[must_use]
    pub fn retry_after(&self) -> Duration {
        self.retry_after_secs
            .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
    }

    /// Checks the settings every API call needs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` for the first empty credential.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        require("metal.project_id", &self.project_id)?;
        require("metal.api_key", &self.api_key)
    }

    /// Builds the create request from the configured device description.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` when a required device field is empty.
    pub fn provision_request(&self) -> Result<ProvisionRequest, ConfigError> {
        require("metal.hostname", &self.hostname)?;
        require("metal.plan", &self.plan)?;
        require("metal.metro", &self.metro)?;
        require("metal.operating_system", &self.operating_system)?;
        Ok(ProvisionRequest {
            metro: self.metro.clone(),
            plan: self.plan.clone(),
            hostname: self.hostname.clone(),
            operating_system: self.operating_system.clone(),
            userdata: self.userdata.clone(),
        })
    }
}

/// Remote host, credentials and the command batch to run.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SshConfig {
    pub hostname: String,
    pub username: String,
    pub privatekey: String,
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub host_key_policy: HostKeyPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("privatekey", &"<redacted>")
            .field("commands", &self.commands)
            .field("port", &self.port)
            .field("host_key_policy", &self.host_key_policy)
            .finish_non_exhaustive()
    }
}

impl SshConfig {
    /// Builds a session target. A non-empty `host` takes precedence over
    /// the configured `hostname`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` when host or username is missing.
    pub fn target(&self, host: Option<&str>) -> Result<SshTarget, ConfigError> {
        let host = host
            .filter(|h| !h.is_empty())
            .unwrap_or(self.hostname.as_str())
            .to_string();
        require("ssh.hostname", &host)?;
        require("ssh.username", &self.username)?;
        Ok(SshTarget {
            host,
            port: self.port.unwrap_or(DEFAULT_SSH_PORT),
            username: self.username.clone(),
            private_key: self.privatekey.clone(),
            host_key_policy: self.host_key_policy,
            connect_timeout: self
                .connect_timeout_secs
                .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
            command_timeout: self
                .command_timeout_secs
                .map_or(DEFAULT_COMMAND_TIMEOUT, Duration::from_secs),
        })
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

fn require(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
