//! Environment variable names read by
//! [`HandlerConfig::from_env`](crate::config::HandlerConfig::from_env).
//!
//! The handler itself never reads the environment.

/// Datadog API key (required).
pub const DD_API_KEY_ENV: &str = "DD_API_KEY";

/// Full intake base URL, e.g. `https://http-intake.logs.datadoghq.eu`.
pub const DD_LOGS_HOST_ENV: &str = "DD_LOGS_HOST";

/// Datadog site, e.g. `datadoghq.eu`. Ignored when `DD_LOGS_HOST` is set.
pub const DD_SITE_ENV: &str = "DD_SITE";

/// `ddsource` override.
pub const DD_SOURCE_ENV: &str = "DD_SOURCE";

/// Service name; defaults to the record's channel.
pub const DD_SERVICE_ENV: &str = "DD_SERVICE";

/// Hostname override; defaults to the local hostname.
pub const DD_HOSTNAME_ENV: &str = "DD_HOSTNAME";

/// Value of the `env:` tag.
pub const DD_ENV_ENV: &str = "DD_ENV";

/// Value of the `version:` tag.
pub const DD_VERSION_ENV: &str = "DD_VERSION";

/// Additional tags, comma separated.
pub const DD_TAGS_ENV: &str = "DD_TAGS";

/// Minimum level handled, e.g. `warning`.
pub const DD_LOG_LEVEL_ENV: &str = "DD_LOG_LEVEL";

/// Request timeout in seconds.
pub const DD_LOGS_TIMEOUT_SECS_ENV: &str = "DD_LOGS_TIMEOUT_SECS";
