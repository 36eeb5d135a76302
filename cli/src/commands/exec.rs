//! `metalctl exec` — run a command batch on the device over SSH.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::app::AppContext;
use crate::application::ports::DeviceStateStore;
use crate::application::services::remote_exec;
use crate::domain::{BatchOutcome, CommandBatch, DeviceError, HostKeyPolicy, SshConfig};
use crate::infra::ssh::OpenSshConnector;
use crate::output;

/// Arguments for `metalctl exec`.
#[derive(Args, Debug, Default)]
pub struct ExecArgs {
    /// Host to connect to [default: ssh.hostname, then the recorded device address]
    #[arg(long)]
    pub host: Option<String>,

    /// Remote user [default: ssh.username]
    #[arg(short, long)]
    pub user: Option<String>,

    /// SSH port [default: ssh.port or 22]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// PEM private key file used instead of ssh.privatekey
    #[arg(long, value_name = "PATH")]
    pub key_file: Option<PathBuf>,

    /// accept-any, trust-on-first-use or strict
    #[arg(long, value_name = "POLICY")]
    pub host_key_policy: Option<HostKeyPolicy>,

    /// Commands to run instead of ssh.commands
    #[arg(last = true, value_name = "CMD")]
    pub commands: Vec<String>,
}

/// Run `metalctl exec`.
///
/// Exits 0 when every command was attempted, even if some exited non-zero,
/// and 1 when the batch could not start or the session broke.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or unreadable.
pub async fn run(app: &AppContext, args: ExecArgs) -> Result<ExitCode> {
    let mut ssh = app.ssh_config()?;
    apply_overrides(&mut ssh, &args)?;

    let host = match args.host.filter(|h| !h.trim().is_empty()) {
        Some(host) => Some(host),
        None if ssh.hostname.trim().is_empty() => recorded_address(app).await?,
        None => None,
    };
    let target = ssh.target(host.as_deref())?;

    let commands = if args.commands.is_empty() {
        ssh.commands
    } else {
        args.commands
    };
    anyhow::ensure!(
        !commands.is_empty(),
        "no commands to run: pass them after `--` or set ssh.commands"
    );
    let batch = CommandBatch::new(commands);

    let connector = OpenSshConnector::new()?;
    let outcome = remote_exec::run_batch(&connector, &target, &batch).await;

    if app.is_json() {
        output::json::print(&outcome_json(&outcome))?;
    } else {
        app.renderer().render_batch(&outcome);
    }

    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_overrides(ssh: &mut SshConfig, args: &ExecArgs) -> Result<()> {
    if let Some(user) = &args.user {
        ssh.username.clone_from(user);
    }
    if let Some(port) = args.port {
        ssh.port = Some(port);
    }
    if let Some(policy) = args.host_key_policy {
        ssh.host_key_policy = policy;
    }
    if let Some(path) = &args.key_file {
        ssh.privatekey = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read key file {}", path.display()))?;
    }
    Ok(())
}

/// Primary address recorded by the last successful readiness check.
async fn recorded_address(app: &AppContext) -> Result<Option<String>> {
    let Some(record) = app.state_mgr.load_async().await? else {
        return Ok(None);
    };
    match (&record.ip, record.device_id()) {
        (Some(ip), _) => Ok(Some(ip.clone())),
        (None, Some(id)) => Err(DeviceError::NoAddress(id.to_string()).into()),
        (None, None) => Ok(None),
    }
}

/// JSON document for a batch outcome.
#[must_use]
pub fn outcome_json(outcome: &BatchOutcome) -> serde_json::Value {
    let mut value = json!({
        "outcome": outcome.kind(),
        "results": outcome.results(),
    });
    match outcome {
        BatchOutcome::Complete(_) => {}
        BatchOutcome::Partial {
            failed_at, reason, ..
        } => {
            value["failed_at"] = json!(failed_at);
            value["reason"] = json!(reason);
        }
        BatchOutcome::AuthFailed(reason) | BatchOutcome::ConnectFailed(reason) => {
            value["reason"] = json!(reason);
        }
    }
    value
}
