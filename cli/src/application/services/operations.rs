//! Device operations: the lifecycle controller plus host-managed state.
//!
//! Each function loads the device record, calls the controller with the
//! stored identifier and persists whatever the controller handed back.
//! Imports only from `crate::domain`, `crate::application::ports` and the
//! lifecycle service.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{DeviceApi, DeviceStateStore, ProgressReporter};
use crate::application::services::lifecycle::LifecycleController;
use crate::domain::{
    DeviceDetails, DeviceError, DeviceRecord, ProvisionRequest, ReadyState, StopOutcome,
};

/// Where a provisioning attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The device is active and its details were recorded.
    Ready {
        device_id: String,
        primary_address: Option<String>,
    },
    /// Not ready yet. Re-invoke after `after`.
    Retry {
        device_id: String,
        after: Duration,
        reason: String,
    },
}

/// Request the device if needed, then check readiness once.
///
/// A newly created identifier is persisted before polling so a crash between
/// the two steps cannot lead to a second create.
///
/// # Errors
///
/// Returns an error if create fails, the device is not found, or state cannot
/// be loaded or saved. A busy service is reported as `Retry`.
pub async fn provision<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
    request: &ProvisionRequest,
    retry_after: Duration,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionOutcome> {
    let mut record = load_record(store).await?;

    reporter.step("requesting device...");
    let created = controller
        .ensure_created(request, record.device_id())
        .await
        .context("requesting device")?;
    if created.created {
        record.set_device_id(&created.id);
        store
            .save_async(&record)
            .await
            .context("recording device id")?;
        reporter.success(&format!("device {} requested", created.id));
    }

    check_ready(controller, store, &mut record, &created.id, retry_after, reporter).await
}

/// Check readiness of the recorded device without creating anything.
///
/// # Errors
///
/// Returns an error if no device is recorded, or as for [`provision`].
pub async fn await_ready<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
    retry_after: Duration,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionOutcome> {
    let mut record = load_record(store).await?;
    let id = require_device_id(&record)?;
    check_ready(controller, store, &mut record, &id, retry_after, reporter).await
}

async fn check_ready<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
    record: &mut DeviceRecord,
    id: &str,
    retry_after: Duration,
    reporter: &impl ProgressReporter,
) -> Result<ProvisionOutcome> {
    let reason = match controller.poll_ready(id).await {
        Ok(ReadyState::Ready(details)) => {
            record.set_details(details);
            store
                .save_async(record)
                .await
                .context("recording device details")?;
            reporter.success("device is ready");
            return Ok(ProvisionOutcome::Ready {
                device_id: id.to_string(),
                primary_address: record.ip.clone(),
            });
        }
        Ok(ReadyState::Pending(reason)) => reason.to_string(),
        Err(e) if e.is_retryable() => e.to_string(),
        Err(e) => return Err(e).with_context(|| format!("waiting for device {id}")),
    };

    reporter.warn(&format!("device not ready yet: {reason}"));
    Ok(ProvisionOutcome::Retry {
        device_id: id.to_string(),
        after: retry_after,
        reason,
    })
}

/// Poll the recorded device once without touching state.
///
/// # Errors
///
/// Returns an error if no device is recorded or the poll fails.
pub async fn status<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
) -> Result<(String, ReadyState)> {
    let record = load_record(store).await?;
    let id = require_device_id(&record)?;
    let state = controller
        .poll_ready(&id)
        .await
        .with_context(|| format!("checking device {id}"))?;
    Ok((id, state))
}

/// Fetch current details of the recorded device and refresh the snapshot.
///
/// # Errors
///
/// Returns an error if no device is recorded, the fetch fails, or state cannot
/// be saved.
pub async fn refresh<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
) -> Result<DeviceDetails> {
    let mut record = load_record(store).await?;
    let id = require_device_id(&record)?;
    let details = controller
        .get_details(&id)
        .await
        .with_context(|| format!("fetching device {id}"))?;
    record.set_details(details.clone());
    store
        .save_async(&record)
        .await
        .context("recording device details")?;
    Ok(details)
}

/// # Errors
///
/// Returns an error if no device is recorded.
pub async fn stop<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
) -> Result<StopOutcome> {
    let record = load_record(store).await?;
    let id = require_device_id(&record)?;
    Ok(controller.stop(&id))
}

/// # Errors
///
/// Returns an error if no device is recorded or the reboot is refused.
pub async fn restart<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    let record = load_record(store).await?;
    let id = require_device_id(&record)?;
    reporter.step(&format!("restarting device {id}..."));
    controller
        .restart(&id)
        .await
        .with_context(|| format!("restarting device {id}"))?;
    reporter.success("reboot initiated");
    Ok(id)
}

/// Delete the recorded device and forget it.
///
/// State is only cleared after the service confirmed the delete.
///
/// # Errors
///
/// Returns an error if no device is recorded, the delete is refused, or state
/// cannot be saved.
pub async fn delete<A: DeviceApi>(
    controller: &LifecycleController<A>,
    store: &impl DeviceStateStore,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    let mut record = load_record(store).await?;
    let id = require_device_id(&record)?;
    reporter.step(&format!("deleting device {id}..."));
    controller
        .delete(&id)
        .await
        .with_context(|| format!("deleting device {id}"))?;
    record.clear();
    store
        .save_async(&record)
        .await
        .context("clearing device state")?;
    reporter.success("device deleted");
    Ok(id)
}

// ── Private helpers ──────────────────────────────────────────────────────────

async fn load_record(store: &impl DeviceStateStore) -> Result<DeviceRecord> {
    Ok(store
        .load_async()
        .await
        .context("loading device state")?
        .unwrap_or_default())
}

fn require_device_id(record: &DeviceRecord) -> Result<String> {
    record
        .device_id()
        .map(str::to_string)
        .ok_or_else(|| DeviceError::NotRequested.into())
}
