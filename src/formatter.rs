use crate::record::LogRecord;
use crate::value::{Exception, Fields, Value};
use serde_json::{Map, Number, Value as Json};

/// Turns a [`LogRecord`] into the text a [`Handler`](crate::handler::Handler)
/// ships.
///
/// Formatting cannot fail: values that have no JSON form are coerced to
/// strings instead.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

const DEFAULT_MAX_NORMALIZE_DEPTH: usize = 9;
const DEFAULT_MAX_NORMALIZE_ITEM_COUNT: usize = 1000;
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

/// Formatter producing the pretty-printed JSON document consumed by
/// [`DatadogHandler`](crate::handler::DatadogHandler).
///
/// On top of the normalized record it stores two carrier fields under
/// `extra`:
/// - `extra.message`: the message with `{key}` placeholders substituted
///   from the context,
/// - `extra.level_name`: the Datadog status (`info`, `warning`, `error`).
#[derive(Clone, Debug)]
pub struct DatadogFormatter {
    include_stacktraces: bool,
    max_normalize_depth: usize,
    max_normalize_item_count: usize,
}

impl Default for DatadogFormatter {
    fn default() -> Self {
        Self {
            include_stacktraces: true,
            max_normalize_depth: DEFAULT_MAX_NORMALIZE_DEPTH,
            max_normalize_item_count: DEFAULT_MAX_NORMALIZE_ITEM_COUNT,
        }
    }
}

impl DatadogFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render exceptions as a one-line summary instead of a structure
    /// with class, message and trace.
    pub fn without_stacktraces(mut self) -> Self {
        self.include_stacktraces = false;
        self
    }

    pub fn with_max_normalize_depth(mut self, depth: usize) -> Self {
        self.max_normalize_depth = depth;
        self
    }

    pub fn with_max_normalize_item_count(mut self, count: usize) -> Self {
        self.max_normalize_item_count = count;
        self
    }

    pub fn includes_stacktraces(&self) -> bool {
        self.include_stacktraces
    }

    /// Normalize the record into a JSON object with the keys `message`,
    /// `context`, `level`, `level_name`, `channel`, `datetime` and
    /// `extra`, in that order.
    pub fn normalize_record(&self, record: &LogRecord) -> Map<String, Json> {
        let mut out = Map::new();
        out.insert("message".to_string(), Json::String(record.message.clone()));
        out.insert("context".to_string(), self.normalize_fields(&record.context, 1));
        out.insert("level".to_string(), Json::from(record.level.code()));
        out.insert("level_name".to_string(), Json::String(record.level_name().to_string()));
        out.insert("channel".to_string(), Json::String(record.channel.clone()));
        out.insert(
            "datetime".to_string(),
            Json::String(record.datetime.format(DATETIME_FORMAT).to_string()),
        );
        out.insert("extra".to_string(), self.normalize_fields(&record.extra, 1));
        out
    }

    /// Normalize a single value as if it sat directly in a record's
    /// context.
    pub fn normalize(&self, value: &Value) -> Json {
        self.normalize_value(value, 2)
    }

    /// Textual form of a context value used when substituting `{key}`
    /// placeholders: compact JSON for sequences, mappings, exceptions and
    /// objects, the plain string form for everything else.
    pub fn render_placeholder(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Seq(_) | Value::Map(_) | Value::Exception(_) | Value::Object { .. } => {
                self.normalize(value).to_string()
            }
        }
    }

    /// Substitute `{key}` placeholders in the record's message with the
    /// rendered context values.
    ///
    /// Substitution is a single pass over the message; replaced text is
    /// never scanned again, and where two placeholders start at the same
    /// position the longer one wins.
    pub fn interpolate(&self, record: &LogRecord) -> String {
        if !record.message.contains('{') {
            return record.message.clone();
        }

        let mut replacements: Vec<(String, String)> = record
            .context
            .iter()
            .map(|(k, v)| (format!("{{{}}}", k), self.render_placeholder(v)))
            .collect();
        replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        replace_all(&record.message, &replacements)
    }

    fn normalize_fields(&self, fields: &Fields, depth: usize) -> Json {
        if depth > self.max_normalize_depth {
            return self.depth_exceeded();
        }

        let mut out = Map::new();
        for (count, (key, value)) in fields.iter().enumerate() {
            if count >= self.max_normalize_item_count {
                out.insert("...".to_string(), self.items_exceeded(fields.len()));
                break;
            }
            out.insert(key.to_string(), self.normalize_value(value, depth + 1));
        }
        Json::Object(out)
    }

    fn normalize_value(&self, value: &Value, depth: usize) -> Json {
        if depth > self.max_normalize_depth {
            return self.depth_exceeded();
        }

        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => normalize_float(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Seq(items) => {
                let mut out = Vec::with_capacity(items.len().min(self.max_normalize_item_count + 1));
                for (count, item) in items.iter().enumerate() {
                    if count >= self.max_normalize_item_count {
                        out.push(self.items_exceeded(items.len()));
                        break;
                    }
                    out.push(self.normalize_value(item, depth + 1));
                }
                Json::Array(out)
            }
            Value::Map(fields) => self.normalize_fields(fields, depth),
            Value::Exception(e) => self.normalize_exception(e, depth),
            Value::Object { class, repr } => {
                let mut out = Map::new();
                out.insert(class.clone(), Json::String(repr.clone()));
                Json::Object(out)
            }
        }
    }

    fn normalize_exception(&self, e: &Exception, depth: usize) -> Json {
        if !self.include_stacktraces {
            return Json::String(exception_summary(e));
        }

        let mut out = Map::new();
        out.insert("class".to_string(), Json::String(e.class.clone()));
        out.insert("message".to_string(), Json::String(e.message.clone()));
        out.insert("code".to_string(), Json::from(e.code));
        if let Some(location) = e.location() {
            out.insert("file".to_string(), Json::String(location));
        }
        if !e.trace.is_empty() {
            let frames = e.trace.iter().cloned().map(Json::String).collect();
            out.insert("trace".to_string(), Json::Array(frames));
        }
        if let Some(previous) = &e.previous {
            out.insert("previous".to_string(), self.normalize_exception(previous, depth + 1));
        }
        Json::Object(out)
    }

    fn depth_exceeded(&self) -> Json {
        Json::String(format!(
            "Over {} levels deep, aborting normalization",
            self.max_normalize_depth
        ))
    }

    fn items_exceeded(&self, total: usize) -> Json {
        Json::String(format!(
            "Over {} items ({} total), aborting normalization",
            self.max_normalize_item_count, total
        ))
    }
}

impl Formatter for DatadogFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut normalized = self.normalize_record(record);

        let message = self.interpolate(record);
        let status = record.level.datadog_status();

        let extra = normalized
            .entry("extra")
            .or_insert_with(|| Json::Object(Map::new()));
        if let Json::Object(extra) = extra {
            extra.insert("message".to_string(), Json::String(message));
            extra.insert("level_name".to_string(), Json::String(status.to_string()));
        }

        // `{:#}` is serde_json's pretty printer and cannot fail.
        format!("{:#}", Json::Object(normalized))
    }
}

fn normalize_float(f: f64) -> Json {
    if f.is_nan() {
        return Json::String("NaN".to_string());
    }
    if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        return Json::String(format!("{}INF", sign));
    }
    Number::from_f64(f)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(f.to_string()))
}

fn exception_summary(e: &Exception) -> String {
    let mut summary = format!("[object] ({}({}): {}", e.class, e.code, e.message);
    if let Some(location) = e.location() {
        summary.push_str(" at ");
        summary.push_str(&location);
    }
    summary.push(')');
    summary
}

/// Replace every occurrence of the `from` patterns in `message`. All
/// patterns start with `{`; `replacements` must be ordered longest
/// pattern first.
fn replace_all(message: &str, replacements: &[(String, String)]) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match replacements.iter().find(|(from, _)| tail.starts_with(from.as_str())) {
            Some((from, to)) => {
                out.push_str(to);
                rest = &tail[from.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Level::Error, "app", message)
            .with_datetime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    fn formatted(formatter: &DatadogFormatter, record: &LogRecord) -> Json {
        serde_json::from_str(&formatter.format(record)).unwrap()
    }

    #[test]
    fn substitutes_scalars_and_structures() {
        let rec = record("User {user} did {action}")
            .with_context("user", "alice")
            .with_context("action", Value::from(json!({"type": "login"})));

        assert_eq!(
            DatadogFormatter::new().interpolate(&rec),
            r#"User alice did {"type":"login"}"#
        );
    }

    #[test]
    fn message_without_braces_is_returned_unchanged() {
        let rec = record("nothing to see here")
            .with_context("user", "alice")
            .with_context("unused", 42);

        assert_eq!(DatadogFormatter::new().interpolate(&rec), "nothing to see here");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let rec = record("{missing} and {known}").with_context("known", 1);
        assert_eq!(DatadogFormatter::new().interpolate(&rec), "{missing} and 1");
    }

    #[test]
    fn substitution_is_not_recursive() {
        let rec = record("{a} {b}")
            .with_context("a", "{b}")
            .with_context("b", "B");
        assert_eq!(DatadogFormatter::new().interpolate(&rec), "{b} B");
    }

    #[test]
    fn longest_placeholder_wins_at_same_position() {
        let replacements = vec![
            ("{a}}".to_string(), "long".to_string()),
            ("{a}".to_string(), "short".to_string()),
        ];
        assert_eq!(replace_all("x{a}}y{a}", &replacements), "xlongyshort");
    }

    #[test]
    fn placeholder_rendering_per_variant() {
        let f = DatadogFormatter::new();
        assert_eq!(f.render_placeholder(&Value::Null), "");
        assert_eq!(f.render_placeholder(&Value::Bool(true)), "true");
        assert_eq!(f.render_placeholder(&Value::Int(-3)), "-3");
        assert_eq!(f.render_placeholder(&Value::Float(1.5)), "1.5");
        assert_eq!(f.render_placeholder(&Value::from(vec![1, 2])), "[1,2]");
        assert_eq!(
            f.render_placeholder(&Value::object("Uuid", "abc")),
            r#"{"Uuid":"abc"}"#
        );
    }

    #[test]
    fn format_injects_carrier_fields_into_extra() {
        let rec = record("hello {name}").with_context("name", "bob");
        let out = formatted(&DatadogFormatter::new(), &rec);

        assert_eq!(out["extra"]["message"], "hello bob");
        assert_eq!(out["extra"]["level_name"], "error");
        assert_eq!(out["message"], "hello {name}");
        assert_eq!(out["level_name"], "ERROR");
        assert_eq!(out["level"], 400);
        assert_eq!(out["channel"], "app");
        assert_eq!(out["datetime"], "2024-01-02T03:04:05.000000+00:00");
    }

    #[test]
    fn notice_maps_to_warning_status() {
        let rec = LogRecord::new(Level::Notice, "app", "m");
        let out = formatted(&DatadogFormatter::new(), &rec);
        assert_eq!(out["extra"]["level_name"], "warning");
    }

    #[test]
    fn output_is_pretty_printed_with_ordered_keys() {
        let text = DatadogFormatter::new().format(&record("m"));
        assert!(text.contains("\n  \"message\": \"m\""));

        let out: Json = serde_json::from_str(&text).unwrap();
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["message", "context", "level", "level_name", "channel", "datetime", "extra"]
        );
    }

    #[test]
    fn empty_context_serializes_as_object() {
        let mut normalized = DatadogFormatter::new().normalize_record(&record("m"));
        assert_eq!(normalized.remove("context"), Some(json!({})));
        assert_eq!(normalized.remove("extra"), Some(json!({})));
    }

    #[test]
    fn numbers_keep_their_json_type() {
        let rec = record("m")
            .with_context("int", 7)
            .with_context("big", u64::MAX)
            .with_context("float", 0.25);
        let out = formatted(&DatadogFormatter::new(), &rec);

        assert_eq!(out["context"]["int"], json!(7));
        assert_eq!(out["context"]["big"], json!(u64::MAX));
        assert_eq!(out["context"]["float"], json!(0.25));
    }

    #[test]
    fn non_finite_floats_become_strings() {
        let f = DatadogFormatter::new();
        assert_eq!(f.normalize(&Value::Float(f64::INFINITY)), json!("INF"));
        assert_eq!(f.normalize(&Value::Float(f64::NEG_INFINITY)), json!("-INF"));
        assert_eq!(f.normalize(&Value::Float(f64::NAN)), json!("NaN"));
    }

    #[test]
    fn exceptions_include_trace_when_enabled() {
        let exception = Exception::new("IoError", "disk full")
            .with_code(28)
            .with_location("src/store.rs", 42)
            .with_trace(["src/store.rs:42", "src/main.rs:7"])
            .with_previous(Exception::new("Os", "ENOSPC"));

        let out = DatadogFormatter::new().normalize(&Value::from(exception));
        assert_eq!(
            out,
            json!({
                "class": "IoError",
                "message": "disk full",
                "code": 28,
                "file": "src/store.rs:42",
                "trace": ["src/store.rs:42", "src/main.rs:7"],
                "previous": {"class": "Os", "message": "ENOSPC", "code": 0}
            })
        );
    }

    #[test]
    fn exceptions_are_summarized_without_stacktraces() {
        let exception = Exception::new("IoError", "disk full").with_location("src/store.rs", 42);
        let out = DatadogFormatter::new()
            .without_stacktraces()
            .normalize(&Value::from(exception));

        assert_eq!(out, json!("[object] (IoError(0): disk full at src/store.rs:42)"));
    }

    #[test]
    fn deep_nesting_is_cut_off() {
        let mut value = Value::from("leaf");
        for _ in 0..12 {
            value = Value::Seq(vec![value]);
        }
        let out = DatadogFormatter::new().with_max_normalize_depth(3).normalize(&value);

        assert_eq!(out, json!([["Over 3 levels deep, aborting normalization"]]));
    }

    #[test]
    fn long_collections_are_truncated() {
        let f = DatadogFormatter::new().with_max_normalize_item_count(2);

        let seq = f.normalize(&Value::from(vec![1, 2, 3]));
        assert_eq!(seq, json!([1, 2, "Over 2 items (3 total), aborting normalization"]));

        let map: Fields = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let out = f.normalize(&Value::Map(map));
        assert_eq!(
            out,
            json!({"a": 1, "b": 2, "...": "Over 2 items (3 total), aborting normalization"})
        );
    }

    #[test]
    fn record_extra_is_preserved_next_to_carrier_fields() {
        let rec = record("m").with_extra("request_id", "r-1");
        let out = formatted(&DatadogFormatter::new(), &rec);

        assert_eq!(
            out["extra"],
            json!({"request_id": "r-1", "message": "m", "level_name": "error"})
        );
    }
}
