use crate::level::Level;
use crate::value::{Fields, Value};
use chrono::{DateTime, Utc};

/// One structured log event as handed to a [`Handler`](crate::handler::Handler).
///
/// `message` is a template and may contain `{key}` placeholders that refer
/// to entries of `context`. Records are never mutated once dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub datetime: DateTime<Utc>,
    pub level: Level,
    pub channel: String,
    pub message: String,
    pub context: Fields,
    pub extra: Fields,
}

impl LogRecord {
    pub fn new(level: Level, channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            datetime: Utc::now(),
            level,
            channel: channel.into(),
            message: message.into(),
            context: Fields::new(),
            extra: Fields::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    pub fn level_name(&self) -> &'static str {
        self.level.name()
    }
}
