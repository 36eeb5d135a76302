//! Infrastructure implementation of the `HttpTransport` port.
//!
//! `UreqTransport` runs blocking `ureq` calls on tokio's blocking pool.
//! Every HTTP status comes back as an `HttpResponse`; only requests that got
//! no response at all become `TransportError`.

use std::time::Duration;

use crate::application::ports::{HttpRequest, HttpResponse, HttpTransport};
use crate::domain::TransportError;

/// Default timeout for a single provisioning API request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Production transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("metalctl/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

impl HttpTransport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || send_blocking(&agent, &request))
            .await
            .map_err(|e| TransportError::new(format!("http task panicked: {e}")))?
    }
}

fn send_blocking(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let mut req = agent.request(request.method.as_str(), &request.url);
    for (name, value) in &request.headers {
        req = req.set(name, value);
    }
    let result = match &request.body {
        Some(body) => req.send_string(body),
        None => req.call(),
    };
    match result {
        Ok(response) | Err(ureq::Error::Status(_, response)) => into_response(response),
        Err(ureq::Error::Transport(transport)) => Err(TransportError::new(transport.to_string())),
    }
}

fn into_response(response: ureq::Response) -> Result<HttpResponse, TransportError> {
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|e| TransportError::new(format!("reading response body: {e}")))?;
    Ok(HttpResponse { status, body })
}
