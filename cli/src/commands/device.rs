//! `metalctl device` — provision, inspect and manage the recorded device.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::app::{AppContext, Controller};
use crate::application::services::operations::{self, ProvisionOutcome};
use crate::domain::{MetalConfig, ReadyState, StopOutcome};
use crate::output;

/// Exit code telling a scheduler to re-invoke later (`EX_TEMPFAIL`).
pub const EX_TEMPFAIL: u8 = 75;

#[derive(Subcommand)]
pub enum DeviceCommand {
    /// Request the device (once) and check whether it is ready
    Create(WaitArgs),

    /// Check readiness of the requested device without creating one
    Start(WaitArgs),

    /// Poll the recorded device once
    Status,

    /// Fetch and record the current device details
    Show,

    /// Stop the device (not supported by the provisioning service)
    Stop,

    /// Reboot the device
    Restart,

    /// Delete the device and forget it
    Delete,
}

/// Arguments controlling how long to wait for readiness.
#[derive(Args, Debug, Clone, Copy)]
pub struct WaitArgs {
    /// Keep polling until the device is ready instead of exiting with 75
    #[arg(long)]
    pub wait: bool,

    /// Polls before giving up when waiting
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,
}

/// Run a `metalctl device` subcommand.
///
/// # Errors
///
/// Returns an error if configuration is missing or the operation fails.
pub async fn run(app: &AppContext, cmd: DeviceCommand) -> Result<ExitCode> {
    let metal = app.metal_config()?;
    let controller = app.controller(&metal);

    match cmd {
        DeviceCommand::Create(args) => provision(app, &controller, &metal, args, true).await,
        DeviceCommand::Start(args) => provision(app, &controller, &metal, args, false).await,
        DeviceCommand::Status => status(app, &controller).await,
        DeviceCommand::Show => show(app, &controller).await,
        DeviceCommand::Stop => stop(app, &controller).await,
        DeviceCommand::Restart => {
            let id = operations::restart(&controller, &app.state_mgr, &app.reporter()).await?;
            if app.is_json() {
                output::json::print(&json!({ "device_id": id, "action": "restart" }))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        DeviceCommand::Delete => {
            let id = operations::delete(&controller, &app.state_mgr, &app.reporter()).await?;
            if app.is_json() {
                output::json::print(&json!({ "device_id": id, "action": "delete" }))?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn provision(
    app: &AppContext,
    controller: &Controller,
    metal: &MetalConfig,
    args: WaitArgs,
    create: bool,
) -> Result<ExitCode> {
    let request = if create {
        Some(metal.provision_request()?)
    } else {
        None
    };
    let retry_after = metal.retry_after();
    let reporter = app.reporter();

    let mut attempt = 1;
    loop {
        let outcome = match &request {
            Some(request) => {
                operations::provision(controller, &app.state_mgr, request, retry_after, &reporter)
                    .await?
            }
            None => {
                operations::await_ready(controller, &app.state_mgr, retry_after, &reporter).await?
            }
        };

        match outcome {
            ProvisionOutcome::Ready {
                device_id,
                primary_address,
            } => {
                report_ready(app, &device_id, primary_address.as_deref())?;
                return Ok(ExitCode::SUCCESS);
            }
            ProvisionOutcome::Retry { after, .. } if args.wait && attempt < args.max_attempts => {
                app.output.info(&format!(
                    "attempt {attempt}/{}: polling again in {}s",
                    args.max_attempts,
                    after.as_secs()
                ));
                tokio::time::sleep(after).await;
                attempt += 1;
            }
            ProvisionOutcome::Retry {
                device_id,
                after,
                reason,
            } => {
                report_pending(app, &device_id, after, &reason)?;
                return Ok(ExitCode::from(EX_TEMPFAIL));
            }
        }
    }
}

fn report_ready(app: &AppContext, device_id: &str, address: Option<&str>) -> Result<()> {
    if app.is_json() {
        return output::json::print(&json!({
            "device_id": device_id,
            "state": "ready",
            "primary_address": address,
        }));
    }
    app.output.kv("Device:", device_id);
    app.output.kv("Address:", address.unwrap_or("-"));
    Ok(())
}

fn report_pending(app: &AppContext, device_id: &str, after: Duration, reason: &str) -> Result<()> {
    if app.is_json() {
        return output::json::print(&json!({
            "device_id": device_id,
            "state": "pending",
            "reason": reason,
            "retry_after_secs": after.as_secs(),
        }));
    }
    app.output
        .info(&format!("pending, retry after {}s", after.as_secs()));
    Ok(())
}

async fn status(app: &AppContext, controller: &Controller) -> Result<ExitCode> {
    let (id, state) = operations::status(controller, &app.state_mgr).await?;
    if app.is_json() {
        let value = match &state {
            ReadyState::Ready(details) => json!({
                "device_id": id,
                "ready": true,
                "device": details,
            }),
            ReadyState::Pending(reason) => json!({
                "device_id": id,
                "ready": false,
                "reason": reason.to_string(),
            }),
        };
        output::json::print(&value)?;
    } else {
        app.renderer().render_ready_state(&id, &state);
    }
    Ok(ExitCode::SUCCESS)
}

async fn show(app: &AppContext, controller: &Controller) -> Result<ExitCode> {
    let details = operations::refresh(controller, &app.state_mgr).await?;
    if app.is_json() {
        output::json::print(&details)?;
    } else {
        app.renderer().render_details(&details);
    }
    Ok(ExitCode::SUCCESS)
}

async fn stop(app: &AppContext, controller: &Controller) -> Result<ExitCode> {
    match operations::stop(controller, &app.state_mgr).await? {
        StopOutcome::NotSupported => {
            if app.is_json() {
                output::json::print(&json!({ "stopped": false, "reason": "not_supported" }))?;
            } else {
                app.output
                    .warn("stop is not supported by the provisioning service; the device keeps running");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
