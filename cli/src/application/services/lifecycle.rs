//! Device lifecycle: idempotent create, readiness polls, restart, delete.
//!
//! The controller holds nothing but its API client. The device identifier
//! comes in as a parameter on every call and goes back out as a return value,
//! so a fresh controller per invocation behaves exactly like a long-lived one.
//!
//! No sleeping or looping happens here. `ReadyState::Pending` and retryable
//! errors tell the caller to come back later.

use tracing::{error, info, warn};

use crate::application::ports::{DeviceApi, DeviceLookup};
use crate::domain::{
    DeviceDetails, EnsureCreated, LifecycleError, PendingReason, ProvisionRequest, ReadyState,
    StopOutcome,
};

/// Drives one device through request → ready and its later actions.
pub struct LifecycleController<A> {
    api: A,
}

impl<A: DeviceApi> LifecycleController<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Request a device unless one was already requested.
    ///
    /// A non-empty `existing_id` is returned unchanged with `created = false`
    /// and no request is sent.
    ///
    /// # Errors
    ///
    /// Any failure to create is `LifecycleError::Provisioning`, including
    /// transport failures: retrying a create without a stored identifier can
    /// request a second device, so the caller must treat it as terminal.
    pub async fn ensure_created(
        &self,
        request: &ProvisionRequest,
        existing_id: Option<&str>,
    ) -> Result<EnsureCreated, LifecycleError> {
        if let Some(id) = existing_id.filter(|id| !id.is_empty()) {
            info!(device_id = id, "device already requested");
            return Ok(EnsureCreated {
                id: id.to_string(),
                created: false,
            });
        }

        info!(
            hostname = %request.hostname,
            plan = %request.plan,
            metro = %request.metro,
            "provisioning bare metal device"
        );
        let details = self
            .api
            .create_device(request)
            .await
            .map_err(|e| match e {
                LifecycleError::Transport(t) => LifecycleError::Provisioning {
                    status: None,
                    body: t.0,
                },
                other => other,
            })
            .inspect_err(|e| error!(error = %e, "device create failed"))?;

        info!(device_id = %details.id, "device provisioning initiated");
        Ok(EnsureCreated {
            id: details.id,
            created: true,
        })
    }

    /// Fetch the device once and report whether it is active.
    ///
    /// Non-active states and statuses the client does not recognise are
    /// `Pending`, not errors.
    ///
    /// # Errors
    ///
    /// `NotFound` when the identifier is dangling (terminal),
    /// `ServiceUnavailable` on 5xx and `Transport` when no response arrived
    /// (both retryable).
    pub async fn poll_ready(&self, id: &str) -> Result<ReadyState, LifecycleError> {
        info!(device_id = id, "fetching device details");
        match self.api.get_device(id).await? {
            DeviceLookup::Found(details) if details.is_active() => {
                info!(device_id = id, "device is active");
                Ok(ReadyState::Ready(details))
            }
            DeviceLookup::Found(details) => {
                info!(device_id = id, state = %details.state, "device still provisioning");
                Ok(ReadyState::Pending(PendingReason::State(details.state)))
            }
            DeviceLookup::Unrecognized { status, body } => {
                warn!(device_id = id, status, body = %body, "unrecognized status while polling, still waiting");
                Ok(ReadyState::Pending(PendingReason::UnrecognizedStatus(status)))
            }
        }
    }

    /// Fetch the device without the pending special case.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ServiceUnavailable` and `Transport` as for
    /// [`Self::poll_ready`]; any other unexpected status is `UnexpectedStatus`.
    pub async fn get_details(&self, id: &str) -> Result<DeviceDetails, LifecycleError> {
        match self.api.get_device(id).await? {
            DeviceLookup::Found(details) => Ok(details),
            DeviceLookup::Unrecognized { status, body } => {
                Err(LifecycleError::UnexpectedStatus { status, body })
            }
        }
    }

    /// No power-off action is sent to the provisioning service; the device
    /// keeps running.
    pub fn stop(&self, id: &str) -> StopOutcome {
        warn!(device_id = id, "stop is not supported by the lifecycle, device left running");
        StopOutcome::NotSupported
    }

    /// Reboot the device.
    ///
    /// # Errors
    ///
    /// `Action` unless the service answered 202.
    pub async fn restart(&self, id: &str) -> Result<(), LifecycleError> {
        info!(device_id = id, "restarting device");
        self.api
            .reboot_device(id)
            .await
            .inspect_err(|e| error!(device_id = id, error = %e, "restart failed"))?;
        info!(device_id = id, "device reboot initiated");
        Ok(())
    }

    /// Delete the device. The identifier is invalid afterwards.
    ///
    /// # Errors
    ///
    /// `Action` unless the service answered 204. Deleting an already deleted
    /// device is reported, not retried.
    pub async fn delete(&self, id: &str) -> Result<(), LifecycleError> {
        info!(device_id = id, "deleting device");
        self.api
            .delete_device(id)
            .await
            .inspect_err(|e| error!(device_id = id, error = %e, "delete failed"))?;
        info!(device_id = id, "device deprovisioned");
        Ok(())
    }
}
