//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout. Failures use the error object below.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{ConfigError, DeviceError, LifecycleError};

/// Format a JSON error object.
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable code for the first typed error in `err`'s chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<LifecycleError>() {
                Some(e.code())
            } else if let Some(e) = cause.downcast_ref::<DeviceError>() {
                Some(match e {
                    DeviceError::NotRequested => "not_requested",
                    DeviceError::NoAddress(_) => "no_address",
                })
            } else if cause.downcast_ref::<ConfigError>().is_some() {
                Some("config")
            } else {
                None
            }
        })
        .unwrap_or("error")
}

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{out}");
    Ok(())
}
