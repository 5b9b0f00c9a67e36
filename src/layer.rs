use crate::error::ConfigError;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::LogRecord;
use crate::value::{Exception, Fields, Value};
use chrono::Utc;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::field::{Field, Visit};
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;
use tracing::{warn, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets never forwarded: this crate and the HTTP stack that delivers
/// records. Their events are emitted while a record is in flight, often
/// from connection tasks outside the handling future.
pub const IGNORED_TARGETS: &[&str] = &[
    "datadog_log_sink",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "want",
    "rustls",
    "tokio_rustls",
    "tower",
    "mio",
];

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// passes every record the [`Handler`] accepts on to it.
///
/// Every qualifying event is handled on its own task spawned on the tokio
/// runtime captured at construction: one event, one task, one request.
/// Nothing is queued, batched or retried.
///
/// The handling future runs without a subscriber, so whatever the handler
/// or its transport logs while sending is dropped instead of becoming
/// another record.
pub struct DatadogLayer {
    handler: Arc<dyn Handler>,
    runtime: Handle,
    ignored_targets: Vec<String>,
}

impl DatadogLayer {
    pub fn new(handler: Arc<dyn Handler>, runtime: Handle) -> Self {
        Self {
            handler,
            runtime,
            ignored_targets: IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Create a layer bound to the runtime of the calling context.
    ///
    /// **Returns**
    /// - `Err(ConfigError::NoRuntime)` when called outside a tokio runtime.
    pub fn try_new(handler: Arc<dyn Handler>) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self::new(handler, runtime))
    }

    /// Never forward events whose target is `prefix` or a module below it,
    /// e.g. the crate behind a custom [`Transport`](crate::transport::Transport).
    pub fn with_ignored_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_targets.push(prefix.into());
        self
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    fn ignores(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|prefix| {
            target
                .strip_prefix(prefix.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

impl<S> Layer<S> for DatadogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if self.ignores(meta.target()) {
            return;
        }

        let mut context = Fields::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut context,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut extra = Fields::new();
        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<Value> = scope
                .from_root()
                .map(|span| Value::from(span.name()))
                .collect();
            if !spans.is_empty() {
                extra.insert("spans", Value::Seq(spans));
            }
        }

        let record = LogRecord {
            datetime: Utc::now(),
            level: Level::from(*meta.level()),
            channel: meta.target().to_string(),
            message: message.unwrap_or_default(),
            context,
            extra,
        };

        if !self.handler.is_handling(&record) {
            return;
        }

        let handler = Arc::clone(&self.handler);
        self.runtime.spawn(async move {
            let result = handler
                .handle(&record)
                .with_subscriber(NoSubscriber::default())
                .await;
            if let Err(e) = result {
                warn!(error = %e, channel = %record.channel, "failed to handle log record");
            }
        });
    }
}

/// Collects event fields: `message` becomes the message template, every
/// other field a context entry.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields
            .insert(field.name(), Value::Exception(Exception::from_dyn(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Duration};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    struct ChannelHandler {
        min: Level,
        tx: mpsc::UnboundedSender<LogRecord>,
    }

    #[async_trait]
    impl Handler for ChannelHandler {
        fn is_handling(&self, record: &LogRecord) -> bool {
            record.level >= self.min
        }

        async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
            let _ = self.tx.send(record.clone());
            Ok(())
        }
    }

    /// Logs through `tracing` from inside `handle`, like a transport whose
    /// client library traces its requests.
    struct ChattyHandler {
        tx: mpsc::UnboundedSender<LogRecord>,
    }

    #[async_trait]
    impl Handler for ChattyHandler {
        fn is_handling(&self, _record: &LogRecord) -> bool {
            true
        }

        async fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
            tracing::error!(target: "vendor_client::pool", "posting log record");
            tokio::task::yield_now().await;
            tracing::debug!(target: "vendor_client::conn", "response received");
            let _ = self.tx.send(record.clone());
            Ok(())
        }
    }

    fn setup(min: Level) -> (DatadogLayer, mpsc::UnboundedReceiver<LogRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let layer = DatadogLayer::try_new(Arc::new(ChannelHandler { min, tx })).unwrap();
        (layer, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<LogRecord>) -> LogRecord {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("record dispatched")
            .expect("channel open")
    }

    #[tokio::test]
    async fn events_become_records() {
        let (layer, mut rx) = setup(Level::Debug);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            let span = tracing::info_span!("request");
            let _entered = span.enter();
            tracing::error!(
                target: "billing",
                user = "alice",
                attempts = 3u64,
                ratio = 0.5,
                ok = false,
                "charge for {{user}} failed"
            );
        }

        let record = next(&mut rx).await;
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.channel, "billing");
        assert_eq!(record.message, "charge for {user} failed");
        assert_eq!(record.context.get("user"), Some(&Value::from("alice")));
        assert_eq!(record.context.get("attempts"), Some(&Value::UInt(3)));
        assert_eq!(record.context.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(record.context.get("ok"), Some(&Value::Bool(false)));
        assert_eq!(
            record.extra.get("spans"),
            Some(&Value::Seq(vec![Value::from("request")]))
        );
    }

    #[tokio::test]
    async fn errors_are_captured_as_exceptions() {
        let (layer, mut rx) = setup(Level::Debug);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
            let err: &(dyn std::error::Error + 'static) = &err;
            tracing::warn!(error = err, "write failed");
        }

        let record = next(&mut rx).await;
        assert_eq!(record.level, Level::Warning);
        let Some(Value::Exception(e)) = record.context.get("error") else {
            panic!("expected exception, got {:?}", record.context.get("error"));
        };
        assert_eq!(e.message, "disk gone");
        assert!(record.extra.is_empty());
    }

    #[tokio::test]
    async fn skips_filtered_and_own_events() {
        let (layer, mut rx) = setup(Level::Warning);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            tracing::info!("below minimum");
            tracing::error!(target: "datadog_log_sink::handler", "internal");
            tracing::error!("delivered");
        }

        let record = next(&mut rx).await;
        assert_eq!(record.message, "delivered");
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn http_stack_events_are_skipped() {
        let (layer, mut rx) = setup(Level::Debug);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            tracing::trace!(target: "hyper::proto::h1::conn", "flushed 512 bytes");
            tracing::debug!(target: "reqwest::connect", "starting new connection");
            tracing::error!(target: "h2", "connection reset");
            tracing::error!(target: "hyperion::jobs", "job failed");
        }

        let record = next(&mut rx).await;
        assert_eq!(record.channel, "hyperion::jobs");
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn custom_ignored_targets() {
        let (layer, mut rx) = setup(Level::Debug);
        let subscriber = Registry::default().with(layer.with_ignored_target("my_transport"));
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            tracing::error!(target: "my_transport::client", "sending");
            tracing::error!(target: "app", "delivered");
        }

        assert_eq!(next(&mut rx).await.channel, "app");
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_logged_while_handling_are_not_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let layer = DatadogLayer::try_new(Arc::new(ChattyHandler { tx })).unwrap();
        let subscriber = Registry::default().with(layer);

        // Keep the subscriber installed while the spawned task runs.
        let _guard = tracing::subscriber::set_default(subscriber);
        tracing::error!(target: "app", "checkout failed");

        let record = next(&mut rx).await;
        assert_eq!(record.channel, "app");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn try_new_requires_a_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handler = Arc::new(ChannelHandler { min: Level::Debug, tx });
        assert!(matches!(DatadogLayer::try_new(handler), Err(ConfigError::NoRuntime)));
    }
}
