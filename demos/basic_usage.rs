//! Basic telemetry usage example
//!
//! Demonstrates logging at each level, metrics, breadcrumbs and an explicit
//! flush through a transport that prints each payload.
//!
//! Run with: cargo run --example basic_usage

use client_telemetry::prelude::*;
use client_telemetry::{info, warn};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run())
}

async fn run() -> Result<()> {
    println!("=== Client Telemetry - Basic Usage Example ===\n");

    let printer = CustomTransport::new(|payload: Payload| async move {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        Ok::<_, TelemetryError>(())
    })
    .named("stdout");

    let publisher = Publisher::builder().transport(printer).build()?;

    // Live logs mirror raw arguments to the console as they are logged
    let logger = Logger::builder()
        .sink(publisher.clone())
        .tag("app", "basic_usage")
        .tag("version", env!("CARGO_PKG_VERSION"))
        .live_logs_enabled(true)
        .build()?;
    let stats = StatsRecorder::with_global_tags(publisher.clone(), ["env:demo"]);

    println!("1. Logging at different levels:");
    logger.debug(["This is a debug message".into()]);
    logger.info(["This is an info message".into()]);
    info!(logger, "Macros take mixed arguments", 42, true);
    warn!(logger, "Disk usage", 0.91);

    println!("\n2. Structured values are sanitized:");
    logger.info([
        "user signed in".into(),
        Value::object([
            ("id", Value::from(17)),
            ("roles", Value::array(["admin", "editor"])),
            ("on_logout", Value::Function),
        ]),
    ]);

    println!("\n3. Errors carry the recent records as breadcrumbs:");
    logger.error(["Checkout failed".into()]);

    stats.increment("demo.runs");
    stats.timing("demo.duration", std::time::Duration::from_millis(12), &["phase:startup"]);

    println!("\n4. Flushing buffered records:");
    let report = publisher.flush().await?;
    println!(
        "\nDelivered {} records via {}",
        report.delivered,
        report.transport.as_deref().unwrap_or("-")
    );

    println!("Metrics: {} flushes succeeded", publisher.metrics().flushes_succeeded());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
