//! Integration tests for the telemetry pipeline
//!
//! These tests verify:
//! - Records flow from logger and stats recorder to a transport
//! - Sanitization of hostile values before buffering
//! - Breadcrumbs on error records
//! - Transport failover and the retry cap
//! - Periodic delivery and tick skipping under a paused clock
//! - Configuration loading from TOML

use async_trait::async_trait;
use client_telemetry::core::{fixed_clock, Payload, Result, TimestampFormat, Transport};
use client_telemetry::live::{FileFlagStore, FlagStore};
use client_telemetry::transports::CustomTransport;
use client_telemetry::{
    ErrorValue, Logger, Publisher, StatsRecorder, Telemetry, TelemetryConfig, TelemetryError,
    Value, Whitelist,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Collects every payload it accepts
#[derive(Default)]
struct CollectingTransport {
    payloads: Mutex<Vec<Payload>>,
}

#[async_trait]
impl Transport for CollectingTransport {
    async fn process(&self, payload: &Payload) -> Result<()> {
        self.payloads.lock().push(payload.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collector"
    }
}

/// Fails every call
struct RejectingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for RejectingTransport {
    async fn process(&self, _payload: &Payload) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TelemetryError::transport("rejecting", "collector unavailable"))
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

/// Blocks every call until released
struct GatedTransport {
    gate: Arc<Notify>,
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn process(&self, _payload: &Payload) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn quiet_logger(publisher: &Arc<Publisher>) -> Logger {
    Logger::builder()
        .sink(publisher.clone())
        .without_console()
        .clock(fixed_clock(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()))
        .build()
        .expect("Failed to build logger")
}

#[tokio::test]
async fn test_end_to_end_delivery() {
    let collector = Arc::new(CollectingTransport::default());
    let publisher = Publisher::builder()
        .shared_transport(collector.clone())
        .build()
        .expect("Failed to build publisher");

    let logger = Logger::builder()
        .sink(publisher.clone())
        .without_console()
        .tag("app", "checkout")
        .clock(fixed_clock(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()))
        .timestamp_format(TimestampFormat::Iso8601)
        .build()
        .expect("Failed to build logger");
    let stats = StatsRecorder::new(publisher.clone());

    logger.info(["cart loaded".into(), 3.into()]);
    stats.timing("cart.load", Duration::from_millis(42), &["region:eu"]);

    let report = publisher.flush().await.expect("Flush failed");
    assert_eq!(report.delivered, 2);
    assert_eq!(report.transport.as_deref(), Some("collector"));

    let payloads = collector.payloads.lock();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].get("logs").unwrap(),
        &[json!({
            "app": "checkout",
            "level": "info",
            "attributes": ["cart loaded", 3],
            "timestamp": "2025-01-08T10:30:45.000Z"
        })]
    );
    assert_eq!(
        payloads[0].get("stats").unwrap(),
        &[json!({"stat": "timing", "params": ["cart.load", 42, ["region:eu"]]})]
    );
}

#[tokio::test]
async fn test_hostile_values_are_sanitized_before_buffering() {
    let publisher = Publisher::builder().build().unwrap();
    let logger = Logger::builder()
        .sink(publisher.clone())
        .without_console()
        .max_object_depth(2)
        .max_array_length(2)
        .whitelist(
            Whitelist::new()
                .allow("id")
                .allow("tokens")
                .nested("user", Whitelist::new().allow("name").allow("profile")),
        )
        .build()
        .unwrap();

    let user = Value::object([
        ("name", Value::from("ada")),
        ("password", Value::from("hunter2")),
        ("profile", Value::object([("deep", Value::from(1))])),
    ]);
    let payload = Value::object([
        ("id", Value::from(7)),
        ("user", user),
        ("tokens", Value::array(["a", "b", "c"])),
        ("session", Value::object([("token", Value::from("secret"))])),
        ("broken", Value::getter(|| Err("getter failed".to_string()))),
    ]);
    logger.info([payload]);

    let records = publisher.buffered("logs");
    assert_eq!(
        records[0]["attributes"],
        json!([{
            "id": 7,
            "user": {
                "name": "ada",
                "password": "-redacted-",
                "profile": "-pruned-"
            },
            "tokens": ["a", "b", "-pruned-"],
            "session": {"redacted": true},
            "broken": "-redacted-"
        }])
    );
}

#[tokio::test]
async fn test_error_records_carry_breadcrumbs() {
    let publisher = Publisher::builder().build().unwrap();
    let logger = quiet_logger(&publisher);

    for step in 0..12 {
        logger.info(["step".into(), step.into()]);
    }
    logger.error(["checkout failed".into()]);

    let records = publisher.buffered("logs");
    let error = records.last().unwrap();
    assert_eq!(error["level"], json!("error"));
    assert_eq!(
        error["attributes"],
        json!([{"message": "checkout failed", "stack": "Error: checkout failed"}])
    );

    let crumbs = error["breadcrumbs"].as_array().unwrap();
    assert_eq!(crumbs.len(), 10);
    assert_eq!(crumbs[0]["attributes"], json!(["step", 2]));
    assert_eq!(crumbs[9]["attributes"], json!(["step", 11]));
    assert!(crumbs.iter().all(|crumb| crumb.get("breadcrumbs").is_none()));
}

#[tokio::test]
async fn test_acknowledged_error_is_not_recorded() {
    let publisher = Publisher::builder().build().unwrap();
    let logger = quiet_logger(&publisher);

    let handled = ErrorValue::new("timeout").acknowledge();
    logger.error(["request failed".into(), handled.into()]);

    assert_eq!(publisher.buffer_len("logs"), 0);
}

#[tokio::test]
async fn test_failover_to_second_transport() {
    let rejecting = Arc::new(RejectingTransport {
        calls: AtomicUsize::new(0),
    });
    let collector = Arc::new(CollectingTransport::default());
    let publisher = Publisher::builder()
        .shared_transport(rejecting.clone())
        .shared_transport(collector.clone())
        .build()
        .unwrap();
    let logger = quiet_logger(&publisher);

    logger.warn(["disk almost full".into()]);
    let report = publisher.flush().await.unwrap();

    assert_eq!(report.transport.as_deref(), Some("collector"));
    assert_eq!(rejecting.calls.load(Ordering::SeqCst), 1);
    assert_eq!(collector.payloads.lock().len(), 1);
    assert_eq!(publisher.buffer_len("logs"), 0);
}

#[tokio::test]
async fn test_batch_discarded_after_retry_cap() {
    let rejecting = Arc::new(RejectingTransport {
        calls: AtomicUsize::new(0),
    });
    let publisher = Publisher::builder()
        .maximum_consecutive_retries(3)
        .shared_transport(rejecting.clone())
        .build()
        .unwrap();
    let logger = quiet_logger(&publisher);

    logger.info(["lost eventually".into()]);

    for attempt in 1..=2 {
        assert!(publisher.flush().await.is_err());
        assert_eq!(publisher.buffer_len("logs"), 1);
        assert_eq!(publisher.retry_count("logs"), attempt);
    }

    assert!(publisher.flush().await.is_err());
    assert_eq!(publisher.buffer_len("logs"), 0);
    assert_eq!(publisher.retry_count("logs"), 0);
    assert_eq!(publisher.metrics().records_discarded(), 1);
    assert_eq!(rejecting.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_custom_transport_receives_payload() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let transport = CustomTransport::new(move |payload: Payload| {
        let seen = Arc::clone(&seen_clone);
        async move {
            seen.lock().push(payload.to_json()?);
            Ok::<_, TelemetryError>(())
        }
    })
    .named("in-memory");

    let publisher = Publisher::builder().transport(transport).build().unwrap();
    let stats = StatsRecorder::new(publisher.clone());
    stats.increment("signups");

    let report = publisher.flush().await.unwrap();
    assert_eq!(report.transport.as_deref(), Some("in-memory"));

    let seen = seen.lock();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&seen[0]).unwrap(),
        json!({"stats": [{"stat": "increment", "params": ["signups", 1, []]}]})
    );
}

#[tokio::test(start_paused = true)]
async fn test_periodic_delivery() {
    let collector = Arc::new(CollectingTransport::default());
    let publisher = Publisher::builder()
        .publish_interval(Duration::from_millis(100))
        .shared_transport(collector.clone())
        .build()
        .unwrap();
    let logger = quiet_logger(&publisher);

    publisher.start().unwrap();
    logger.info(["first".into()]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(collector.payloads.lock().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(collector.payloads.lock().len(), 1);

    publisher.stop();
    logger.info(["second".into()]);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(collector.payloads.lock().len(), 1);
    assert_eq!(publisher.buffer_len("logs"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_skipped_while_flush_in_flight() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(GatedTransport {
        gate: Arc::clone(&gate),
        calls: AtomicUsize::new(0),
    });
    let publisher = Publisher::builder()
        .publish_interval(Duration::from_millis(100))
        .shared_transport(transport.clone())
        .build()
        .unwrap();
    let logger = quiet_logger(&publisher);

    logger.info(["slow".into()]);
    publisher.start().unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(publisher.is_flush_in_progress());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert!(publisher.metrics().ticks_skipped() >= 2);

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!publisher.is_flush_in_progress());
    assert_eq!(publisher.buffer_len("logs"), 0);

    publisher.stop();
}

#[tokio::test]
async fn test_shutdown_flushes_remaining_records() {
    let collector = Arc::new(CollectingTransport::default());
    let config = TelemetryConfig::default();
    let transport: Arc<dyn Transport> = collector.clone();
    let telemetry = Telemetry::with_transports(&config, vec![transport]).unwrap();

    telemetry.start().unwrap();
    telemetry.stats().gauge("queue.depth", 12, &[]);

    assert!(telemetry.shutdown(Duration::from_secs(1)).await);
    assert!(!telemetry.publisher().is_started());
    assert_eq!(collector.payloads.lock().len(), 1);
}

#[tokio::test]
async fn test_config_loaded_from_toml_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("telemetry.toml");
    std::fs::write(
        &path,
        r#"
[publisher]
publish_interval_ms = 1500
maximum_batch_size = 20

[logger.tags]
service = "billing"

[stats]
global_tags = ["env:staging"]
"#,
    )
    .unwrap();

    let config = TelemetryConfig::load(&path).await.expect("Failed to load config");
    assert_eq!(config.publisher.publish_interval_ms, 1500);
    assert_eq!(config.publisher.maximum_batch_size, 20);
    assert_eq!(config.publisher.maximum_buffer_size, 1000);
    assert_eq!(config.stats.global_tags, vec!["env:staging".to_string()]);

    let telemetry = Telemetry::from_config(&config).unwrap();
    telemetry.logger().info(["ready".into()]);
    let records = telemetry.publisher().buffered("logs");
    assert_eq!(records[0]["service"], json!("billing"));
}

#[test]
fn test_live_logs_flag_persists_across_stores() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("flags.json");

    let publisher = Publisher::builder().build().unwrap();
    let logger = Logger::builder()
        .sink(publisher)
        .flag_store(Arc::new(FileFlagStore::new(&path)))
        .build()
        .unwrap();
    assert!(!logger.is_live_logging_enabled());

    logger.enable_live_logs().unwrap();
    assert!(logger.is_live_logging_enabled());

    let reopened = FileFlagStore::new(&path);
    assert_eq!(reopened.get("sm.live_logs").unwrap().as_deref(), Some("1"));
}
