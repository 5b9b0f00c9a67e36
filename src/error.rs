/// Error returned by [`Handler::handle`](crate::handler::Handler::handle).
///
/// Only an internal inconsistency between formatter and handler ends up
/// here; delivery failures are swallowed and never reach the caller.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("formatted payload is not valid JSON: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("formatted payload is not a JSON object")]
    PayloadNotObject,
}

/// Error returned when shipping an envelope to the intake API fails.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("request to log intake failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("request to log intake timed out")]
    Timeout,

    #[error("log intake responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Error returned when building a handler configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Datadog API key is missing")]
    MissingApiKey,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("invalid request timeout: {0}")]
    InvalidTimeout(String),

    #[error("no tokio runtime available to dispatch log records")]
    NoRuntime,

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}
