use tokio::time::{sleep, Duration};
use tracing::{error, info};

use datadog_log_sink::init::{init_from_env, LayerConfig};

/// Reads `DD_API_KEY`, `DD_SITE`, `DD_SERVICE`, `DD_ENV`, ... and ships
/// every event at or above `DD_LOG_LEVEL` to Datadog.
#[tokio::main]
async fn main() {
    init_from_env(LayerConfig::default()).expect("configure datadog handler");

    info!("starting service");

    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed for user {{user_id}}"
    );

    sleep(Duration::from_secs(2)).await;
}
