//! Provisioning API client — implements the `DeviceApi` port.
//!
//! `MetalApiClient<T>` builds every request (URL, `X-Auth-Token`, JSON body)
//! and maps response status codes to outcomes. It owns no retry logic.
//! Generic over `T: HttpTransport` so tests can inject a recording transport.

use tracing::debug;

use crate::application::ports::{
    DeviceApi, DeviceLookup, HttpMethod, HttpRequest, HttpResponse, HttpTransport,
};
use crate::domain::{DeviceAction, DeviceDetails, LifecycleError, MetalConfig, ProvisionRequest};

/// Header carrying the API key on every request.
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Stateless wrapper around the provisioning service.
///
/// One client per project and API key; do not share it between credentials.
pub struct MetalApiClient<T> {
    transport: T,
    base_url: String,
    project_id: String,
    api_key: String,
}

impl<T: HttpTransport> MetalApiClient<T> {
    pub fn new(
        transport: T,
        base_url: &str,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Client for the project and endpoint named in `config`.
    pub fn from_config(transport: T, config: &MetalConfig) -> Self {
        Self::new(
            transport,
            config.api_url(),
            config.project_id.clone(),
            config.api_key.clone(),
        )
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        let mut headers = vec![(AUTH_HEADER.to_string(), self.api_key.clone())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LifecycleError> {
        debug!(method = request.method.as_str(), url = %request.url, "provisioning api request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "provisioning api response");
        Ok(response)
    }
}

impl<T: HttpTransport> DeviceApi for MetalApiClient<T> {
    async fn create_device(
        &self,
        request: &ProvisionRequest,
    ) -> Result<DeviceDetails, LifecycleError> {
        let body = serde_json::to_string(request)
            .map_err(|e| LifecycleError::Decode(format!("encoding create request: {e}")))?;
        debug!(payload = %body, "create device payload");
        let path = format!("/projects/{}/devices", self.project_id);
        let response = self
            .send(self.request(HttpMethod::Post, &path, Some(body)))
            .await?;

        if !is_success(response.status) {
            return Err(LifecycleError::Provisioning {
                status: Some(response.status),
                body: response.body,
            });
        }
        serde_json::from_str(&response.body)
            .map_err(|e| LifecycleError::Decode(format!("create response has no id: {e}")))
    }

    async fn get_device(&self, id: &str) -> Result<DeviceLookup, LifecycleError> {
        let response = self
            .send(self.request(HttpMethod::Get, &format!("/devices/{id}"), None))
            .await?;
        match response.status {
            status if is_success(status) => serde_json::from_str(&response.body)
                .map(DeviceLookup::Found)
                .map_err(|e| LifecycleError::Decode(format!("device {id}: {e}"))),
            404 => Err(LifecycleError::NotFound { id: id.to_string() }),
            status if status >= 500 => Err(LifecycleError::ServiceUnavailable {
                status,
                body: response.body,
            }),
            status => Ok(DeviceLookup::Unrecognized {
                status,
                body: response.body,
            }),
        }
    }

    async fn reboot_device(&self, id: &str) -> Result<(), LifecycleError> {
        let body = serde_json::json!({ "type": "reboot" }).to_string();
        let response = self
            .send(self.request(
                HttpMethod::Post,
                &format!("/devices/{id}/actions"),
                Some(body),
            ))
            .await?;
        expect_status(response, DeviceAction::Restart, 202)
    }

    async fn delete_device(&self, id: &str) -> Result<(), LifecycleError> {
        let response = self
            .send(self.request(HttpMethod::Delete, &format!("/devices/{id}"), None))
            .await?;
        expect_status(response, DeviceAction::Delete, 204)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn expect_status(
    response: HttpResponse,
    action: DeviceAction,
    expected: u16,
) -> Result<(), LifecycleError> {
    if response.status == expected {
        return Ok(());
    }
    Err(LifecycleError::Action {
        action,
        expected,
        status: response.status,
        body: response.body,
    })
}
