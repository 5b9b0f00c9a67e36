use crate::error::DeliveryError;
use async_trait::async_trait;

/// One outbound POST to the log intake API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl IntakeRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Delivers [`IntakeRequest`]s built by
/// [`DatadogHandler`](crate::handler::DatadogHandler).
///
/// Implementations send the request exactly once: no retries, no
/// buffering. Any failure (connection error, timeout, non-2xx status) is
/// reported as a [`DeliveryError`]; the handler decides what to do with
/// it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: IntakeRequest) -> Result<(), DeliveryError>;
}

/// A transport that drops every request.
///
/// Useful for measuring the overhead of formatting and envelope assembly
/// without any network I/O.
#[derive(Clone, Debug, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _request: IntakeRequest) -> Result<(), DeliveryError> {
        Ok(())
    }
}
