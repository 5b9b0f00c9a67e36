use crate::config::DEFAULT_TIMEOUT;
use crate::error::DeliveryError;
use crate::transport::{IntakeRequest, Transport};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// [`Transport`] backed by a `reqwest` client with a bounded request
/// timeout.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client with timeout, using defaults");
            Client::new()
        });
        Self { client }
    }

    /// Wrap an existing client, e.g. one configured with a proxy.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: IntakeRequest) -> Result<(), DeliveryError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let resp = builder.body(request.body).send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout
            } else {
                DeliveryError::Request(Box::new(e))
            }
        })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(DeliveryError::Status { status, body })
        }
    }
}
