use crate::config::HandlerConfig;
use crate::error::{DeliveryError, HandlerError};
use crate::formatter::{DatadogFormatter, Formatter};
use crate::hostname::{HostnameResolver, SystemHostname};
use crate::record::LogRecord;
use crate::transport::{IntakeRequest, Transport};
use async_trait::async_trait;
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use tracing::debug;

/// Destination for [`LogRecord`]s dispatched by the host logging framework.
///
/// The framework checks [`Handler::is_handling`] before calling
/// [`Handler::handle`] once per record.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Whether the record's level is at or above the handler's minimum.
    fn is_handling(&self, record: &LogRecord) -> bool;

    /// Whether records should continue to the next handler after this
    /// one. Honored by the host framework, never by the handler itself.
    fn bubbles(&self) -> bool {
        true
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError>;
}

/// Ships each record to the Datadog Logs Intake API as one JSON POST.
///
/// Delivery is best effort: a failed request is logged at debug level and
/// dropped, so [`Handler::handle`] only fails when the formatter produced
/// something that is not a JSON object.
pub struct DatadogHandler {
    config: HandlerConfig,
    url: String,
    formatter: Box<dyn Formatter>,
    transport: Arc<dyn Transport>,
    hostname: Arc<dyn HostnameResolver>,
}

impl DatadogHandler {
    /// Create a handler that posts with a `reqwest` client bounded by
    /// `config.timeout`.
    #[cfg(feature = "http")]
    pub fn new(config: HandlerConfig) -> Self {
        let transport = crate::http::ReqwestTransport::new(config.timeout);
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a handler that delivers through the given transport.
    pub fn with_transport(config: HandlerConfig, transport: Arc<dyn Transport>) -> Self {
        let url = config.intake_url();
        Self {
            config,
            url,
            formatter: Box::new(DatadogFormatter::new()),
            transport,
            hostname: Arc::new(SystemHostname),
        }
    }

    /// Replace the default [`DatadogFormatter`].
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn with_hostname_resolver(mut self, resolver: Arc<dyn HostnameResolver>) -> Self {
        self.hostname = resolver;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Turn the formatter output for `record` into the intake envelope.
    ///
    /// `extra.message` and `extra.level_name` are moved to the top level
    /// (the latter stringified and upper-cased), then `ddsource`,
    /// `ddtags`, `hostname` and `service` are added.
    pub fn build_envelope(&self, record: &LogRecord, formatted: &str) -> Result<Json, HandlerError> {
        let mut payload = match serde_json::from_str(formatted)? {
            Json::Object(map) => map,
            _ => return Err(HandlerError::PayloadNotObject),
        };

        let mut message = Json::String(record.message.clone());
        let mut level_name = None;

        if let Some(Json::Object(extra)) = payload.get_mut("extra") {
            if let Some(promoted) = take_set(extra, "message") {
                message = promoted;
            }
            if let Some(promoted) = take_set(extra, "level_name") {
                let text = match promoted {
                    Json::String(s) => s,
                    other => other.to_string(),
                };
                level_name = Some(Json::String(text.to_uppercase()));
            }
        }

        if let Some(level_name) = level_name {
            payload.insert("level_name".to_string(), level_name);
        }
        payload.insert("message".to_string(), message);

        let attributes = &self.config.attributes;
        let hostname = attributes
            .hostname
            .clone()
            .unwrap_or_else(|| self.hostname.hostname());

        payload.insert("ddsource".to_string(), Json::String(attributes.source().to_string()));
        payload.insert("ddtags".to_string(), Json::String(attributes.tags(record)));
        payload.insert("hostname".to_string(), Json::String(hostname));
        payload.insert(
            "service".to_string(),
            Json::String(attributes.service(record).to_string()),
        );

        Ok(Json::Object(payload))
    }

    /// Wrap an envelope into the POST sent to the intake endpoint.
    pub fn request(&self, envelope: &Json) -> IntakeRequest {
        IntakeRequest {
            url: self.url.clone(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("DD-API-KEY", self.config.api_key.clone()),
            ],
            body: envelope.to_string().into_bytes(),
        }
    }

    /// Send a single request. The result is only observed by
    /// [`Handler::handle`], which discards failures.
    pub async fn send(&self, request: IntakeRequest) -> Result<(), DeliveryError> {
        self.transport.send(request).await
    }
}

#[async_trait]
impl Handler for DatadogHandler {
    fn is_handling(&self, record: &LogRecord) -> bool {
        record.level >= self.config.level
    }

    fn bubbles(&self) -> bool {
        self.config.bubble
    }

    async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let formatted = self.formatter.format(record);
        let envelope = self.build_envelope(record, &formatted)?;
        let request = self.request(&envelope);

        if let Err(e) = self.send(request).await {
            debug!(
                error = %e,
                channel = %record.channel,
                level = %record.level,
                "dropping log record after failed delivery"
            );
        }

        Ok(())
    }
}

/// Remove `key` from `map` unless it is absent or null.
fn take_set(map: &mut Map<String, Json>, key: &str) -> Option<Json> {
    match map.get(key) {
        None | Some(Json::Null) => None,
        Some(_) => map.shift_remove(key),
    }
}
