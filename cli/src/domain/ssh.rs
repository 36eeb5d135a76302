//! Secure-shell target description and key validation.
//!
//! Pure functions only — no I/O.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ConfigError, SessionError};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// How the identity of the remote host is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Any host key is accepted and nothing is recorded.
    AcceptAny,
    /// Unknown keys are accepted and pinned; a changed key is refused.
    #[default]
    TrustOnFirstUse,
    /// Only keys already pinned are accepted.
    Strict,
}

impl HostKeyPolicy {
    pub const VALID: &'static [&'static str] = &["accept-any", "trust-on-first-use", "strict"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcceptAny => "accept-any",
            Self::TrustOnFirstUse => "trust-on-first-use",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept-any" => Ok(Self::AcceptAny),
            "trust-on-first-use" | "tofu" => Ok(Self::TrustOnFirstUse),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::InvalidValue {
                key: "ssh.host_key_policy".to_string(),
                value: other.to_string(),
                valid: Self::VALID.join(", "),
            }),
        }
    }
}

/// Everything needed to open one authenticated session.
#[derive(Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// PEM-encoded private key text.
    pub private_key: String,
    pub host_key_policy: HostKeyPolicy,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl fmt::Debug for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("private_key", &"<redacted>")
            .field("host_key_policy", &self.host_key_policy)
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

/// Checks that `pem` is a single unencrypted PEM private key block.
///
/// Only the framing is verified (matching `BEGIN`/`END` labels ending in
/// `PRIVATE KEY`, base64 body). Whether the key material itself is valid is
/// left to the SSH client.
///
/// # Errors
///
/// Returns `SessionError::Key` describing the first problem found.
pub fn validate_private_key(pem: &str) -> Result<(), SessionError> {
    let lines: Vec<&str> = pem
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Err(key_error("private key is empty"));
    };

    let begin = pem_label(first, "-----BEGIN ")
        .ok_or_else(|| key_error("missing '-----BEGIN ... PRIVATE KEY-----' line"))?;
    let end = pem_label(last, "-----END ")
        .ok_or_else(|| key_error("missing '-----END ... PRIVATE KEY-----' line"))?;
    if begin != end {
        return Err(key_error(&format!(
            "BEGIN label '{begin}' does not match END label '{end}'"
        )));
    }
    if !begin.ends_with("PRIVATE KEY") {
        return Err(key_error(&format!("'{begin}' is not a private key")));
    }
    if begin.starts_with("ENCRYPTED") {
        return Err(key_error("passphrase-protected keys are not supported"));
    }

    let inner = &lines[1..lines.len() - 1];
    if inner.iter().any(|l| l.starts_with("Proc-Type:") && l.contains("ENCRYPTED")) {
        return Err(key_error("passphrase-protected keys are not supported"));
    }
    let body: Vec<&&str> = inner.iter().filter(|l| !l.contains(':')).collect();
    if body.is_empty() {
        return Err(key_error("key has no body"));
    }
    if let Some(bad) = body.iter().find(|l| !l.chars().all(is_base64_char)) {
        return Err(key_error(&format!("invalid characters in key body: {bad:?}")));
    }
    Ok(())
}

fn pem_label<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)?
        .strip_suffix("-----")
        .filter(|label| !label.is_empty())
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

fn key_error(message: &str) -> SessionError {
    SessionError::Key(message.to_string())
}
