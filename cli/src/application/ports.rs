//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{
    DeviceDetails, DeviceRecord, LifecycleError, MetalctlConfig, ProvisionRequest, SessionError,
    SshTarget, TransportError,
};

// ── HTTP Transport Port ───────────────────────────────────────────────────────

/// HTTP methods used by the provisioning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// A fully built request. Constructed once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of any response, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests and returns every response the server produced. Only
/// failures to obtain a response at all are errors.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ── Provisioning API Port ─────────────────────────────────────────────────────

/// Result of fetching a device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceLookup {
    Found(DeviceDetails),
    /// A status the client does not map to success, not-found or unavailable.
    Unrecognized { status: u16, body: String },
}

/// Provisioning service operations with status codes already mapped.
#[allow(async_fn_in_trait)]
pub trait DeviceApi {
    /// Request a new device. Only a success status yields `Ok`.
    async fn create_device(&self, request: &ProvisionRequest)
    -> Result<DeviceDetails, LifecycleError>;
    /// Fetch device details. 404 and 5xx are errors.
    async fn get_device(&self, id: &str) -> Result<DeviceLookup, LifecycleError>;
    /// Issue a reboot action. Expects 202.
    async fn reboot_device(&self, id: &str) -> Result<(), LifecycleError>;
    /// Delete the device. Expects 204.
    async fn delete_device(&self, id: &str) -> Result<(), LifecycleError>;
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// Captured result of one remote invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

/// Opens authenticated sessions.
#[allow(async_fn_in_trait)]
pub trait ShellConnector {
    type Session: ShellSession;

    /// Connect and authenticate. Key problems and key rejection must be
    /// reported as authentication errors.
    async fn connect(&self, target: &SshTarget) -> Result<Self::Session, SessionError>;
}

/// One open session. Every command is an independent remote invocation.
#[allow(async_fn_in_trait)]
pub trait ShellSession {
    /// Run `command`. A non-zero remote exit is not an error; only a broken
    /// session is.
    async fn exec(&mut self, command: &str) -> Result<ExecOutput, SessionError>;
    /// Tear the session down. Must be safe after a failed `exec`.
    async fn close(self);
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// A process that outlived its timeout and was killed.
#[derive(Debug, thiserror::Error)]
#[error("{program} timed out after {}s", .after.as_secs())]
pub struct TimedOut {
    pub program: String,
    pub after: Duration,
}

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program with a timeout and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned) and
    /// the error must downcast to [`TimedOut`].
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Spawn a long-lived program with all standard streams discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State and Config Ports ────────────────────────────────────────────────────

/// Abstracts device state persistence (load/save).
#[allow(async_fn_in_trait)]
pub trait DeviceStateStore {
    /// Load the current record, returning `None` if no state exists.
    async fn load_async(&self) -> Result<Option<DeviceRecord>>;
    /// Persist the given record.
    async fn save_async(&self, record: &DeviceRecord) -> Result<()>;
}

/// Abstracts loading the configuration bundle.
pub trait ConfigStore {
    /// Load the configuration, or the default when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<MetalctlConfig>;
    /// Path the configuration is read from.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
