use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{error, info};
use datadog_log_sink::{
    attributes::Attributes,
    error::DeliveryError,
    init::init_tracing,
    transport::{IntakeRequest, Transport},
    DatadogHandler, HandlerConfig, Level,
};

/// Example of plugging a custom transport into the handler. Imagine this
/// forwards to a local agent or a proxy; here it just prints the body.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn send(&self, request: IntakeRequest) -> Result<(), DeliveryError> {
        println!("[{}] {}", request.url, String::from_utf8_lossy(&request.body));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config = HandlerConfig::new("example-key")
        .with_level(Level::Warning)
        .with_attributes(Attributes {
            service: Some("checkout".to_string()),
            env: Some("dev".to_string()),
            tags: vec!["team:payments".to_string()],
            ..Default::default()
        });
    let handler = DatadogHandler::with_transport(config, Arc::new(StdoutTransport));

    init_tracing(Arc::new(handler)).expect("install subscriber");

    info!("custom transport example started");
    error!(order_id = 123, "order {{order_id}} failed");

    sleep(Duration::from_millis(200)).await;
}
