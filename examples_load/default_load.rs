use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use datadog_log_sink::init::{init_tracing_with_config, LayerConfig};
use datadog_log_sink::transport::NoopTransport;
use datadog_log_sink::{DatadogHandler, HandlerConfig};

#[tokio::main]
async fn main() {
    let handler = DatadogHandler::with_transport(HandlerConfig::new("unused"), Arc::new(NoopTransport));

    init_tracing_with_config(Arc::new(handler), LayerConfig { enable_stdout: false })
        .expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "load test error {{iteration}}");
    }

    let elapsed = start.elapsed();
    println!("dispatched {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give spawned handler tasks a little time to finish
    sleep(Duration::from_secs(2)).await;
}
