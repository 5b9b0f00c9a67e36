use crate::attributes::Attributes;
use crate::env::*;
use crate::error::ConfigError;
use crate::level::Level;
use std::time::Duration;

/// Default Datadog Logs Intake base URL (US1 site).
pub const DEFAULT_HOST: &str = "https://http-intake.logs.datadoghq.com";

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction-time settings of a
/// [`DatadogHandler`](crate::handler::DatadogHandler). Immutable once the
/// handler is built.
///
/// **Fields**
/// - `api_key`: sent as the `DD-API-KEY` header.
/// - `host`: intake base URL; `/api/v2/logs` is appended.
/// - `attributes`: optional Datadog attributes (source, service, ...).
/// - `level`: minimum level the handler accepts.
/// - `bubble`: whether records continue to other handlers. Passed
///   through to the host framework.
/// - `timeout`: bound on a single intake request.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerConfig {
    pub api_key: String,
    pub host: String,
    pub attributes: Attributes,
    pub level: Level,
    pub bubble: bool,
    pub timeout: Duration,
}

impl HandlerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: DEFAULT_HOST.to_string(),
            attributes: Attributes::default(),
            level: Level::Debug,
            bubble: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the logs endpoint.
    pub fn intake_url(&self) -> String {
        format!("{}/api/v2/logs", self.host.trim_end_matches('/'))
    }

    /// Build a configuration from the `DD_*` environment variables listed
    /// in [`crate::env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`HandlerConfig::from_env`] with a custom variable lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(DD_API_KEY_ENV).ok_or(ConfigError::MissingApiKey)?;
        let mut config = HandlerConfig::new(api_key);

        if let Some(host) = get(DD_LOGS_HOST_ENV) {
            config.host = host;
        } else if let Some(site) = get(DD_SITE_ENV) {
            config.host = format!("https://http-intake.logs.{}", site);
        }

        if let Some(level) = get(DD_LOG_LEVEL_ENV) {
            config.level = level
                .parse()
                .map_err(|_| ConfigError::InvalidLevel(level.clone()))?;
        }

        if let Some(secs) = get(DD_LOGS_TIMEOUT_SECS_ENV) {
            let parsed: u64 = secs
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs.clone()))?;
            config.timeout = Duration::from_secs(parsed);
        }

        config.attributes = Attributes {
            source: get(DD_SOURCE_ENV),
            service: get(DD_SERVICE_ENV),
            hostname: get(DD_HOSTNAME_ENV),
            version: get(DD_VERSION_ENV),
            env: get(DD_ENV_ENV),
            tags: get(DD_TAGS_ENV)
                .map(|tags| {
                    tags.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(config)
    }
}
