use crate::error::ConfigError;
use crate::handler::Handler;
use crate::layer::DatadogLayer;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added next to [`DatadogLayer`] and events are also printed to the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that forwards events to
/// `handler`.
///
/// Must be called from within a tokio runtime; records are handled on
/// tasks spawned on that runtime.
///
/// **Returns**
/// - `Err(ConfigError::NoRuntime)` outside a tokio runtime.
/// - `Err(ConfigError::SubscriberAlreadySet)` if a global subscriber was
///   installed earlier.
pub fn init_tracing_with_config(
    handler: Arc<dyn Handler>,
    config: LayerConfig,
) -> Result<(), ConfigError> {
    let layer = DatadogLayer::try_new(handler)?;

    // The two branches build different subscriber types.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| ConfigError::SubscriberAlreadySet)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| ConfigError::SubscriberAlreadySet)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(handler: Arc<dyn Handler>) -> Result<(), ConfigError> {
    init_tracing_with_config(handler, LayerConfig::default())
}

/// Build a [`DatadogHandler`](crate::handler::DatadogHandler) from the
/// `DD_*` environment variables and install it globally.
#[cfg(feature = "http")]
pub fn init_from_env(config: LayerConfig) -> Result<(), ConfigError> {
    let handler_config = crate::config::HandlerConfig::from_env()?;
    let handler = crate::handler::DatadogHandler::new(handler_config);
    init_tracing_with_config(Arc::new(handler), config)
}
