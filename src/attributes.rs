use crate::record::LogRecord;
use serde::{Deserialize, Serialize};

/// `ddsource` used when no `source` attribute is configured.
pub const DEFAULT_SOURCE: &str = "rust";

/// Optional Datadog attributes injected into every envelope.
///
/// Unset fields fall back to defaults resolved at send time: `source` to
/// [`DEFAULT_SOURCE`], `service` to the record's channel and `hostname`
/// to the local machine's hostname.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub source: Option<String>,
    pub service: Option<String>,
    pub hostname: Option<String>,
    pub version: Option<String>,
    pub env: Option<String>,
    pub tags: Vec<String>,
}

impl Attributes {
    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }

    pub fn service<'a>(&'a self, record: &'a LogRecord) -> &'a str {
        self.service.as_deref().unwrap_or(&record.channel)
    }

    /// Build the `ddtags` value: user tags first, then `level:`, `env:`
    /// and `version:`, comma separated.
    pub fn tags(&self, record: &LogRecord) -> String {
        let mut default_tags = format!("level:{}", record.level_name());

        if let Some(env) = &self.env {
            default_tags.push_str(",env:");
            default_tags.push_str(env);
        }

        if let Some(version) = &self.version {
            default_tags.push_str(",version:");
            default_tags.push_str(version);
        }

        if self.tags.is_empty() {
            return default_tags;
        }

        format!("{},{}", self.tags.join(","), default_tags)
    }
}
