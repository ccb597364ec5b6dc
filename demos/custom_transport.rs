//! Custom transport example
//!
//! Implements the `Transport` trait for a flaky in-memory collector and
//! shows failover, requeueing and the retry cap.
//!
//! Run with: cargo run --example custom_transport

use async_trait::async_trait;
use client_telemetry::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Rejects the first `failures` payloads, then accepts everything
struct FlakyCollector {
    failures: usize,
    calls: AtomicUsize,
    accepted: Mutex<Vec<Payload>>,
}

#[async_trait]
impl Transport for FlakyCollector {
    async fn process(&self, payload: &Payload) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(TelemetryError::transport(self.name(), "collector warming up"));
        }
        self.accepted.lock().push(payload.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Client Telemetry - Custom Transport Example ===\n");

    let collector = Arc::new(FlakyCollector {
        failures: 2,
        calls: AtomicUsize::new(0),
        accepted: Mutex::new(Vec::new()),
    });

    let publisher = Publisher::builder()
        .maximum_consecutive_retries(5)
        .shared_transport(collector.clone())
        .build()?;
    let logger = Logger::builder()
        .sink(publisher.clone())
        .without_console()
        .build()?;

    logger.info(["order placed".into(), Value::object([("order_id", Value::from(1001))])]);
    logger.warn(["payment slow".into()]);

    for attempt in 1..=3 {
        match publisher.flush().await {
            Ok(report) => {
                println!("Attempt {}: delivered {} records", attempt, report.delivered);
                break;
            }
            Err(e) => println!(
                "Attempt {}: {} (requeued, retry count {})",
                attempt,
                e,
                publisher.retry_count("logs")
            ),
        }
    }

    // A transport added at the front is tried first from now on
    let audit = CustomTransport::new(|payload: Payload| async move {
        println!("[audit] {}", payload.to_json()?);
        Ok::<_, TelemetryError>(())
    })
    .named("audit");
    publisher.insert_transport(0, Arc::new(audit));
    println!("\nTransport chain: {:?}", publisher.transport_names());

    logger.info(["order shipped".into()]);
    publisher.flush().await?;

    println!(
        "\nFlaky collector accepted {} payload(s)",
        collector.accepted.lock().len()
    );
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
