//! Telemetry configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. A few settings can be overridden from the environment.

use super::{
    error::{Result, TelemetryError},
    formatter::FormatterConfig,
    overflow_policy::OverflowPolicy,
    tags::FieldValue,
    timestamp::TimestampFormat,
};
use crate::live::DEFAULT_LIVE_LOGS_KEY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `publisher.publish_interval_ms`
pub const ENV_PUBLISH_INTERVAL_MS: &str = "CLIENT_TELEMETRY_PUBLISH_INTERVAL_MS";

/// Overrides `logger.live_logs_enabled` (`true`/`false` or `1`/`0`)
pub const ENV_LIVE_LOGS: &str = "CLIENT_TELEMETRY_LIVE_LOGS";

/// Overrides `http.url`, creating the `http` section if needed
pub const ENV_HTTP_URL: &str = "CLIENT_TELEMETRY_HTTP_URL";

/// Complete configuration for a [`Telemetry`](crate::Telemetry) pipeline
///
/// # Example
///
/// ```
/// use client_telemetry::TelemetryConfig;
///
/// let config = TelemetryConfig::from_toml_str(r#"
///     [publisher]
///     publish_interval_ms = 5000
///
///     [logger.formatter.whitelist]
///     user_id = true
///     request = { path = true }
/// "#).unwrap();
///
/// assert_eq!(config.publisher.publish_interval_ms, 5000);
/// assert_eq!(config.publisher.maximum_batch_size, 50);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub publisher: PublisherConfig,
    pub logger: LoggerConfig,
    pub stats: StatsConfig,
    /// Collector endpoint; no HTTP transport is created when absent
    pub http: Option<HttpTransportConfig>,
}

/// Delivery engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub publish_interval_ms: u64,
    pub maximum_batch_size: usize,
    pub maximum_buffer_size: usize,
    pub maximum_consecutive_retries: u32,
    pub overflow_policy: OverflowPolicy,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 3000,
            maximum_batch_size: 50,
            maximum_buffer_size: 1000,
            maximum_consecutive_retries: 10,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl PublisherConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.publish_interval_ms == 0 {
            return Err(TelemetryError::config(
                "publisher",
                "publish_interval_ms must be greater than 0",
            ));
        }
        if self.maximum_batch_size == 0 {
            return Err(TelemetryError::config(
                "publisher",
                "maximum_batch_size must be greater than 0",
            ));
        }
        if self.maximum_buffer_size == 0 {
            return Err(TelemetryError::config(
                "publisher",
                "maximum_buffer_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Record emitter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub formatter: FormatterConfig,
    pub timestamp_format: TimestampFormat,
    /// Literal tags added to every record
    pub tags: BTreeMap<String, FieldValue>,
    pub live_logs_key: String,
    pub live_logs_enabled: bool,
    /// Persist the live logs switch in this JSON file instead of memory
    pub live_logs_file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            formatter: FormatterConfig::default(),
            timestamp_format: TimestampFormat::default(),
            tags: BTreeMap::new(),
            live_logs_key: DEFAULT_LIVE_LOGS_KEY.to_string(),
            live_logs_enabled: false,
            live_logs_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Tags prepended to every metric, e.g. `"env:prod"`
    pub global_tags: Vec<String>,
}

/// HTTP collector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl HttpTransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl TelemetryConfig {
    /// Parse a TOML document. Environment overrides are not applied.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file, then apply environment
    /// overrides. A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no telemetry config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.load_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            TelemetryError::config("config", format!("failed to serialize: {}", e))
        })?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup(ENV_PUBLISH_INTERVAL_MS) {
            match interval.trim().parse() {
                Ok(ms) => self.publisher.publish_interval_ms = ms,
                Err(_) => tracing::warn!(
                    variable = ENV_PUBLISH_INTERVAL_MS,
                    value = %interval,
                    "ignoring unparseable override"
                ),
            }
        }

        if let Some(live) = lookup(ENV_LIVE_LOGS) {
            match live.trim().to_lowercase().as_str() {
                "1" | "true" | "on" => self.logger.live_logs_enabled = true,
                "0" | "false" | "off" => self.logger.live_logs_enabled = false,
                _ => tracing::warn!(
                    variable = ENV_LIVE_LOGS,
                    value = %live,
                    "ignoring unparseable override"
                ),
            }
        }

        if let Some(url) = lookup(ENV_HTTP_URL) {
            match self.http.as_mut() {
                Some(http) => http.url = url,
                None => self.http = Some(HttpTransportConfig::new(url)),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.publisher.validate()?;

        if let Some(ref http) = self.http {
            if http.url.trim().is_empty() {
                return Err(TelemetryError::config("http", "url must not be empty"));
            }
            if http.timeout_ms == 0 {
                return Err(TelemetryError::config(
                    "http",
                    "timeout_ms must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::whitelist::Whitelist;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_is_default() {
        let config = TelemetryConfig::from_toml_str("").unwrap();
        assert_eq!(config, TelemetryConfig::default());
        assert_eq!(config.publisher.publish_interval(), Duration::from_millis(3000));
        assert_eq!(config.publisher.maximum_batch_size, 50);
        assert_eq!(config.publisher.maximum_buffer_size, 1000);
        assert_eq!(config.publisher.maximum_consecutive_retries, 10);
        assert_eq!(config.logger.live_logs_key, "sm.live_logs");
        assert!(config.http.is_none());
    }

    #[test]
    fn test_full_document() {
        let config = TelemetryConfig::from_toml_str(
            r#"
            [publisher]
            maximum_batch_size = 10
            overflow_policy = "drop_oldest"

            [logger]
            timestamp_format = "unix_millis"
            live_logs_enabled = true

            [logger.tags]
            service = "checkout"
            build = 42

            [logger.formatter]
            max_array_length = 5

            [logger.formatter.whitelist]
            user_id = true
            request = { path = true }

            [stats]
            global_tags = ["env:prod"]

            [http]
            url = "https://collector.example.com/v1/batch"
            headers = { "x-api-key" = "secret" }
            "#,
        )
        .unwrap();

        assert_eq!(config.publisher.maximum_batch_size, 10);
        assert_eq!(config.publisher.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(config.logger.timestamp_format, TimestampFormat::UnixMillis);
        assert!(config.logger.live_logs_enabled);
        assert_eq!(config.logger.tags["build"], FieldValue::Int(42));
        assert_eq!(config.logger.formatter.max_array_length, 5);
        assert_eq!(config.logger.formatter.max_object_depth, 3);
        assert_eq!(
            config.logger.formatter.whitelist,
            Some(
                Whitelist::new()
                    .allow("user_id")
                    .nested("request", Whitelist::new().allow("path"))
            )
        );
        assert_eq!(config.stats.global_tags, vec!["env:prod"]);

        let http = config.http.unwrap();
        assert_eq!(http.method, "POST");
        assert_eq!(http.timeout(), Duration::from_secs(10));
        assert_eq!(http.headers["x-api-key"], "secret");
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(matches!(
            TelemetryConfig::from_toml_str("[publisher]\nmaximum_batch_size = \"lots\""),
            Err(TelemetryError::Toml(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = TelemetryConfig::default();
        assert!(config.validate().is_ok());

        config.publisher.publish_interval_ms = 0;
        assert!(config.validate().is_err());

        config.publisher.publish_interval_ms = 100;
        config.http = Some(HttpTransportConfig::new("  "));
        assert!(matches!(
            config.validate(),
            Err(TelemetryError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PUBLISH_INTERVAL_MS, "250"),
            (ENV_LIVE_LOGS, "1"),
            (ENV_HTTP_URL, "http://localhost:9000/logs"),
        ]
        .into_iter()
        .collect();

        let mut config = TelemetryConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.publisher.publish_interval_ms, 250);
        assert!(config.logger.live_logs_enabled);
        assert_eq!(config.http.unwrap().url, "http://localhost:9000/logs");
    }

    #[test]
    fn test_unparseable_overrides_are_ignored() {
        let mut config = TelemetryConfig::default();
        config.apply_overrides(|key| match key {
            ENV_PUBLISH_INTERVAL_MS => Some("soon".to_string()),
            ENV_LIVE_LOGS => Some("maybe".to_string()),
            _ => None,
        });

        assert_eq!(config, TelemetryConfig::default());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("telemetry.toml");

        let mut original = TelemetryConfig::default();
        original.publisher.maximum_batch_size = 25;
        original.http = Some(HttpTransportConfig::new("https://collector.example.com"));
        original.save(&path).await.unwrap();

        let loaded = TelemetryConfig::load(&path).await.unwrap();
        assert_eq!(loaded.publisher.maximum_batch_size, 25);
        assert_eq!(
            loaded.http.map(|http| http.url),
            Some("https://collector.example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TelemetryConfig::load(temp_dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.publisher, PublisherConfig::default());
    }
}
