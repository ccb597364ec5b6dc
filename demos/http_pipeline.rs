//! HTTP delivery example
//!
//! Ships batches to an HTTP collector on a timer, falling back to stdout
//! when the collector is unreachable. Pipeline diagnostics are printed
//! through `tracing`.
//!
//! Run with:
//!   CLIENT_TELEMETRY_HTTP_URL=http://127.0.0.1:8080/batch \
//!   RUST_LOG=client_telemetry=debug cargo run --example http_pipeline

use client_telemetry::core::config::ENV_HTTP_URL;
use client_telemetry::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Client Telemetry - HTTP Pipeline Example ===\n");

    let url = std::env::var(ENV_HTTP_URL).unwrap_or_else(|_| "http://127.0.0.1:8080/batch".to_string());
    println!("Collector: {}", url);

    let http = HttpTransport::builder()
        .url(url)
        .header("x-client", "http_pipeline_demo")
        .timeout(Duration::from_secs(2))
        .build()?;

    let fallback = CustomTransport::new(|payload: Payload| async move {
        println!("[fallback] {} records: {}", payload.record_count(), payload.to_json()?);
        Ok::<_, TelemetryError>(())
    })
    .named("stdout-fallback");

    let publisher = Publisher::builder()
        .publish_interval(Duration::from_millis(500))
        .maximum_batch_size(5)
        .transport(http)
        .transport(fallback)
        .build()?;
    publisher.start()?;

    let logger = Logger::builder()
        .sink(publisher.clone())
        .without_console()
        .tag("app", "http_pipeline")
        .build()?;
    let stats = StatsRecorder::new(publisher.clone());

    for i in 0..12 {
        logger.info(["processing item".into(), i.into()]);
        stats.increment_tagged("items.processed", &["source:demo"]);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    logger.error(["simulated failure after batch".into()]);

    let delivered = publisher.shutdown(Duration::from_secs(3)).await;
    let metrics = publisher.metrics();
    println!(
        "\nFinal flush ok: {}, delivered: {}, transport failures: {}, dropped: {}",
        delivered,
        metrics.records_delivered(),
        metrics.transport_failures(),
        metrics.overflow_dropped()
    );

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
