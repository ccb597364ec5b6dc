//! Core telemetry types and traits

pub mod breadcrumbs;
pub mod config;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod payload;
pub mod publisher;
pub mod stats;
pub mod tags;
pub mod timestamp;
pub mod transport;
pub mod value;
pub mod whitelist;

pub use breadcrumbs::{BreadcrumbTrail, BREADCRUMB_CAPACITY};
pub use config::{
    HttpTransportConfig, LoggerConfig, PublisherConfig, StatsConfig, TelemetryConfig,
};
pub use error::{Result, TelemetryError};
pub use formatter::{Formatter, FormatterConfig, FUNCTION_PLACEHOLDER, PRUNED, REDACTED};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::PublisherMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use payload::{Payload, Record};
pub use publisher::{
    FlushReport, Publisher, PublisherBuilder, RecordSink, LOGS_CATEGORY, STATS_CATEGORY,
};
pub use stats::{MetricValue, StatKind, StatsRecorder};
pub use tags::{FieldValue, Tag, Tags};
pub use timestamp::{fixed_clock, system_clock, Clock, TimestampFormat};
pub use transport::Transport;
pub use value::{ErrorValue, Getter, Value};
pub use whitelist::{Whitelist, WhitelistNode};
