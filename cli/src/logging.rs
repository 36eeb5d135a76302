//! Diagnostic logging setup.
//!
//! User-facing output goes through `output::OutputContext`; `tracing` events
//! are diagnostics and always go to stderr so `--json` output on stdout stays
//! parseable.

use tracing_subscriber::EnvFilter;

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "METALCTL_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Builds the filter from `METALCTL_LOG`, then `RUST_LOG`, then `warn`.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
