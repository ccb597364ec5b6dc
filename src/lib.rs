//! # Client Telemetry
//!
//! A client-side telemetry pipeline: structured log records and metrics
//! are sanitized, buffered per category and shipped in batches to a
//! remote collector through an ordered chain of transports.
//!
//! ## Features
//!
//! - **Safe by construction**: arbitrary values are bounded in depth and
//!   length, and fields outside a whitelist are redacted
//! - **Breadcrumbs**: error records carry the last ten records before them
//! - **Failover**: transports are tried in order until one accepts a batch
//! - **Bounded memory**: per-category buffer caps and a retry cap per
//!   category
//! - **Live logs**: optional mirroring of raw arguments to a console

pub mod core;
pub mod live;
pub mod macros;
pub mod telemetry;
pub mod transports;

pub mod prelude {
    pub use crate::core::{
        ErrorValue, FieldValue, FlushReport, Formatter, FormatterConfig, LogLevel, Logger,
        LoggerBuilder, MetricValue, OverflowCallback, OverflowPolicy, Payload, Publisher,
        PublisherBuilder, PublisherConfig, PublisherMetrics, RecordSink, Result, StatsRecorder,
        Tag, Tags, TelemetryConfig, TelemetryError, TimestampFormat, Transport, Value, Whitelist,
    };
    pub use crate::telemetry::{Telemetry, DEFAULT_SHUTDOWN_TIMEOUT};
    pub use crate::transports::CustomTransport;
    #[cfg(feature = "http")]
    pub use crate::transports::HttpTransport;
}

pub use core::{
    ErrorValue, FieldValue, FlushReport, Formatter, FormatterConfig, LogLevel, Logger,
    LoggerBuilder, MetricValue, OverflowCallback, OverflowPolicy, Payload, Publisher,
    PublisherBuilder, PublisherConfig, PublisherMetrics, RecordSink, Result, StatsRecorder, Tag,
    Tags, TelemetryConfig, TelemetryError, TimestampFormat, Transport, Value, Whitelist,
};
pub use telemetry::{Telemetry, DEFAULT_SHUTDOWN_TIMEOUT};
