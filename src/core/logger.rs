//! Main logger implementation
//!
//! A `Logger` turns each call into one record in the `logs` category:
//! the evaluated tags, then `level`, `attributes` (the formatted
//! arguments) and `timestamp`. Non-error records also go onto the
//! breadcrumb trail; error records carry a copy of the trail instead.

use super::{
    breadcrumbs::BreadcrumbTrail,
    error::{Result, TelemetryError},
    formatter::{Formatter, FormatterConfig},
    log_level::LogLevel,
    publisher::{RecordSink, LOGS_CATEGORY},
    tags::{FieldValue, Tag, Tags},
    timestamp::{system_clock, Clock, TimestampFormat},
    value::{panic_message, ErrorValue, Value},
    whitelist::Whitelist,
};
use crate::live::{
    ConsoleSink, FlagStore, MemoryFlagStore, StdConsole, DEFAULT_LIVE_LOGS_KEY, LIVE_LOGS_ON,
};
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct Logger {
    sink: Arc<dyn RecordSink>,
    tags: Tags,
    formatter: Arc<Formatter>,
    breadcrumbs: Mutex<BreadcrumbTrail>,
    clock: Clock,
    timestamp_format: TimestampFormat,
    console: Option<Arc<dyn ConsoleSink>>,
    flag_store: Arc<dyn FlagStore>,
    live_logs_key: String,
    live_logs_enabled: bool,
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use client_telemetry::{Logger, Publisher};
    ///
    /// let publisher = Publisher::builder().build().unwrap();
    /// let logger = Logger::builder()
    ///     .sink(publisher.clone())
    ///     .tag("service", "checkout")
    ///     .build()
    ///     .unwrap();
    ///
    /// logger.info(["order placed".into()]);
    /// assert_eq!(publisher.buffer_len("logs"), 1);
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Record `args` at `level`
    pub fn emit(&self, level: LogLevel, args: impl IntoIterator<Item = Value>) {
        let args: Vec<Value> = args.into_iter().collect();
        if self.is_live_logging_enabled() {
            self.mirror(level, &args);
        }

        let attributes: Vec<Json> = args
            .iter()
            .filter_map(|arg| self.formatter.format(arg))
            .collect();

        let mut record = self.tags.evaluate();
        record.insert("level".to_string(), Json::from(level.as_str()));
        record.insert("attributes".to_string(), Json::Array(attributes));
        record.insert(
            "timestamp".to_string(),
            self.timestamp_format.render(&(self.clock)()),
        );

        if level == LogLevel::Error {
            let crumbs = self.breadcrumbs.lock().snapshot();
            record.insert("breadcrumbs".to_string(), Json::Array(crumbs));
            self.sink.add_to_bucket(LOGS_CATEGORY, Json::Object(record));
        } else {
            let record = Json::Object(record);
            self.breadcrumbs.lock().add(record.clone());
            self.sink.add_to_bucket(LOGS_CATEGORY, record);
        }
    }

    #[inline]
    pub fn debug(&self, args: impl IntoIterator<Item = Value>) {
        self.emit(LogLevel::Debug, args);
    }

    #[inline]
    pub fn info(&self, args: impl IntoIterator<Item = Value>) {
        self.emit(LogLevel::Info, args);
    }

    /// Alias for [`Logger::info`]
    #[inline]
    pub fn log(&self, args: impl IntoIterator<Item = Value>) {
        self.emit(LogLevel::Info, args);
    }

    #[inline]
    pub fn warn(&self, args: impl IntoIterator<Item = Value>) {
        self.emit(LogLevel::Warn, args);
    }

    /// Record an error.
    ///
    /// Does nothing if the first error among `args` was acknowledged. A
    /// leading string with no error anywhere in `args` is promoted to an
    /// error so the record carries a stack.
    pub fn error(&self, args: impl IntoIterator<Item = Value>) {
        let mut args: Vec<Value> = args.into_iter().collect();

        let first_error = args.iter().find_map(Value::as_error);
        if first_error.is_some_and(ErrorValue::is_acked) {
            return;
        }

        if first_error.is_none() {
            if let Some(Value::String(message)) = args.first_mut() {
                let message = std::mem::take(message);
                args[0] = Value::Error(ErrorValue::new(message));
            }
        }

        self.emit(LogLevel::Error, args);
    }

    /// A logger with `extra` merged over this logger's tags.
    ///
    /// It shares the sink and live logs settings but starts with an empty
    /// breadcrumb trail.
    #[must_use]
    pub fn with_tags(&self, extra: &Tags) -> Logger {
        Logger {
            sink: Arc::clone(&self.sink),
            tags: self.tags.merged(extra),
            formatter: Arc::clone(&self.formatter),
            breadcrumbs: Mutex::new(BreadcrumbTrail::new()),
            clock: Arc::clone(&self.clock),
            timestamp_format: self.timestamp_format.clone(),
            console: self.console.clone(),
            flag_store: Arc::clone(&self.flag_store),
            live_logs_key: self.live_logs_key.clone(),
            live_logs_enabled: self.live_logs_enabled,
        }
    }

    /// Persist the live logs switch. Takes effect immediately for every
    /// logger reading the same flag store.
    pub fn enable_live_logs(&self) -> Result<()> {
        self.flag_store.set(&self.live_logs_key, LIVE_LOGS_ON)
    }

    pub fn is_live_logging_enabled(&self) -> bool {
        if self.console.is_none() {
            return false;
        }
        if self.live_logs_enabled {
            return true;
        }

        match self.flag_store.get(&self.live_logs_key) {
            Ok(flag) => flag.as_deref() == Some(LIVE_LOGS_ON),
            Err(e) => {
                tracing::debug!(error = %e, "could not read live logs flag");
                false
            }
        }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Copy of the current breadcrumb trail
    pub fn breadcrumbs(&self) -> Vec<Json> {
        self.breadcrumbs.lock().snapshot()
    }

    fn mirror(&self, level: LogLevel, args: &[Value]) {
        let Some(console) = self.console.as_ref() else {
            return;
        };

        let written = catch_unwind(AssertUnwindSafe(|| {
            let target = console.supports(level).then_some(level);
            console.write(target, args);
        }));

        if let Err(panic_info) = written {
            tracing::debug!(
                reason = %panic_message(panic_info.as_ref()),
                "live log console panicked"
            );
        }
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use client_telemetry::{FieldValue, Logger, Publisher, Whitelist};
///
/// let publisher = Publisher::builder().build().unwrap();
/// let logger = Logger::builder()
///     .sink(publisher)
///     .tag("env", "prod")
///     .computed_tag("pid", || FieldValue::from(std::process::id()))
///     .max_array_length(5)
///     .whitelist(Whitelist::new().allow("user_id"))
///     .live_logs_enabled(false)
///     .build()
///     .unwrap();
/// # drop(logger);
/// ```
pub struct LoggerBuilder {
    sink: Option<Arc<dyn RecordSink>>,
    tags: Tags,
    formatter: FormatterConfig,
    clock: Option<Clock>,
    timestamp_format: TimestampFormat,
    console: Option<Arc<dyn ConsoleSink>>,
    flag_store: Option<Arc<dyn FlagStore>>,
    live_logs_key: String,
    live_logs_enabled: bool,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            sink: None,
            tags: Tags::new(),
            formatter: FormatterConfig::default(),
            clock: None,
            timestamp_format: TimestampFormat::default(),
            console: Some(Arc::new(StdConsole::new())),
            flag_store: None,
            live_logs_key: DEFAULT_LIVE_LOGS_KEY.to_string(),
            live_logs_enabled: false,
        }
    }

    /// Where records go. Required.
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn tag(mut self, key: impl Into<String>, tag: impl Into<Tag>) -> Self {
        self.tags.insert(key, tag);
        self
    }

    /// Add a tag evaluated on every emission
    #[must_use = "builder methods return a new value"]
    pub fn computed_tag<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        self.tags.insert(key, Tag::computed(f));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, config: FormatterConfig) -> Self {
        self.formatter = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_object_depth(mut self, depth: usize) -> Self {
        self.formatter.max_object_depth = depth;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_array_length(mut self, length: usize) -> Self {
        self.formatter.max_array_length = length;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn whitelist(mut self, whitelist: Whitelist) -> Self {
        self.formatter.whitelist = Some(whitelist);
        self
    }

    /// Replace the wall clock used for record timestamps
    #[must_use = "builder methods return a new value"]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    /// Never mirror, whatever the live logs switch says
    #[must_use = "builder methods return a new value"]
    pub fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flag_store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.flag_store = Some(store);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn live_logs_key(mut self, key: impl Into<String>) -> Self {
        self.live_logs_key = key.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn live_logs_enabled(mut self, enabled: bool) -> Self {
        self.live_logs_enabled = enabled;
        self
    }

    /// Build the Logger
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if no sink was given.
    pub fn build(self) -> Result<Logger> {
        let sink = self
            .sink
            .ok_or_else(|| TelemetryError::config("logger", "a record sink is required"))?;

        Ok(Logger {
            sink,
            tags: self.tags,
            formatter: Arc::new(Formatter::new(self.formatter)),
            breadcrumbs: Mutex::new(BreadcrumbTrail::new()),
            clock: self.clock.unwrap_or_else(system_clock),
            timestamp_format: self.timestamp_format,
            console: self.console,
            flag_store: self
                .flag_store
                .unwrap_or_else(|| Arc::new(MemoryFlagStore::new())),
            live_logs_key: self.live_logs_key,
            live_logs_enabled: self.live_logs_enabled,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
