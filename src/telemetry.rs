//! Pipeline facade
//!
//! Wires a publisher, a logger and a stats recorder from one
//! [`TelemetryConfig`].

use crate::core::{Logger, Publisher, Result, StatsRecorder, TelemetryConfig, Transport};
use crate::live::FileFlagStore;
use std::sync::Arc;
use std::time::Duration;

/// Default time allowed for the final flush in [`Telemetry::shutdown`]
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A configured telemetry pipeline
///
/// # Example
///
/// ```no_run
/// use client_telemetry::{Telemetry, TelemetryConfig, DEFAULT_SHUTDOWN_TIMEOUT};
///
/// # async fn run() -> client_telemetry::Result<()> {
/// let config = TelemetryConfig::load("telemetry.toml").await?;
/// let telemetry = Telemetry::from_config(&config)?;
/// telemetry.start()?;
///
/// telemetry.logger().info(["service started".into()]);
/// telemetry.stats().increment("service.start");
///
/// telemetry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await;
/// # Ok(())
/// # }
/// ```
pub struct Telemetry {
    publisher: Arc<Publisher>,
    logger: Logger,
    stats: StatsRecorder,
}

impl Telemetry {
    /// Build the pipeline. The publisher is not started.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for invalid publisher or HTTP settings, or
    /// when an `http` section is present but the `http` feature is off.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::with_transports(config, Vec::new())
    }

    /// Build the pipeline with `transports` tried before any configured
    /// HTTP transport.
    pub fn with_transports(
        config: &TelemetryConfig,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut builder = Publisher::builder().config(config.publisher.clone());
        for transport in transports {
            builder = builder.shared_transport(transport);
        }
        if let Some(ref http) = config.http {
            builder = builder.shared_transport(http_transport(http)?);
        }
        let publisher = builder.build()?;

        let logger_config = &config.logger;
        let mut logger = Logger::builder()
            .sink(publisher.clone())
            .formatter(logger_config.formatter.clone())
            .timestamp_format(logger_config.timestamp_format.clone())
            .live_logs_key(logger_config.live_logs_key.as_str())
            .live_logs_enabled(logger_config.live_logs_enabled);
        for (key, value) in &logger_config.tags {
            logger = logger.tag(key.as_str(), value.clone());
        }
        if let Some(ref path) = logger_config.live_logs_file {
            logger = logger.flag_store(Arc::new(FileFlagStore::new(path)));
        }
        let logger = logger.build()?;

        let stats =
            StatsRecorder::with_global_tags(publisher.clone(), config.stats.global_tags.clone());

        tracing::debug!(
            transports = ?publisher.transport_names(),
            interval_ms = config.publisher.publish_interval_ms,
            "telemetry pipeline built"
        );

        Ok(Self {
            publisher,
            logger,
            stats,
        })
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Start periodic delivery
    pub fn start(&self) -> Result<()> {
        self.publisher.start()
    }

    /// Stop periodic delivery and make one bounded final flush
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.publisher.shutdown(timeout).await
    }
}

#[cfg(feature = "http")]
fn http_transport(config: &crate::core::HttpTransportConfig) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(crate::transports::HttpTransport::from_config(config)?))
}

#[cfg(not(feature = "http"))]
fn http_transport(_config: &crate::core::HttpTransportConfig) -> Result<Arc<dyn Transport>> {
    Err(crate::core::TelemetryError::config(
        "http",
        "an http section is configured but the `http` feature is disabled",
    ))
}
