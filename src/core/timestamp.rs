//! Record timestamps
//!
//! Every record carries the time of its emission. The wall clock is
//! injectable so tests can pin it, and the rendering is configurable for
//! collectors that expect numeric epochs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;

/// Source of the current time for record timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The system wall clock
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A clock frozen at `instant`
pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

/// Timestamp rendering options
///
/// # Examples
///
/// ```
/// use client_telemetry::core::TimestampFormat;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(
///     TimestampFormat::Iso8601.render(&at),
///     serde_json::json!("2025-01-08T10:30:45.000Z")
/// );
/// assert_eq!(
///     TimestampFormat::UnixMillis.render(&at),
///     serde_json::json!(1736332245000_i64)
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// ISO 8601 with microseconds: `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// RFC 3339 with offset: `2025-01-08T10:30:45.123+00:00`
    Rfc3339,

    /// Unix timestamp in seconds, rendered as a JSON number
    Unix,

    /// Unix timestamp in milliseconds, rendered as a JSON number
    UnixMillis,

    /// Custom strftime format
    Custom(String),
}

impl TimestampFormat {
    /// Format a `DateTime<Utc>` as text
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => {
                datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, false)
            }
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Render the `timestamp` field of a record
    ///
    /// Numeric formats become JSON numbers, everything else a string.
    #[must_use]
    pub fn render(&self, datetime: &DateTime<Utc>) -> Json {
        match self {
            TimestampFormat::Unix => Json::from(datetime.timestamp()),
            TimestampFormat::UnixMillis => Json::from(datetime.timestamp_millis()),
            _ => Json::String(self.format(datetime)),
        }
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TimestampFormat::Unix | TimestampFormat::UnixMillis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_iso8601_format() {
        let result = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123Z");
    }

    #[test]
    fn test_iso8601_micros_format() {
        let result = TimestampFormat::Iso8601Micros.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123456Z");
    }

    #[test]
    fn test_rfc3339_format() {
        let result = TimestampFormat::Rfc3339.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123+00:00");
    }

    #[test]
    fn test_numeric_formats_render_as_numbers() {
        let at = fixed_datetime();
        assert_eq!(TimestampFormat::Unix.render(&at), json!(1736332245_i64));
        assert_eq!(
            TimestampFormat::UnixMillis.render(&at),
            json!(1736332245123_i64)
        );
        assert!(TimestampFormat::UnixMillis.is_numeric());
        assert!(!TimestampFormat::Iso8601.is_numeric());
    }

    #[test]
    fn test_custom_format() {
        let format = TimestampFormat::Custom("%Y/%m/%d %H:%M".to_string());
        assert_eq!(format.render(&fixed_datetime()), json!("2025/01/08 10:30"));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = fixed_clock(fixed_datetime());
        assert_eq!(clock(), fixed_datetime());
        assert_eq!(clock(), clock());
    }

    #[test]
    fn test_deserialization() {
        let format: TimestampFormat =
            serde_json::from_str("\"unix_millis\"").expect("deserialize unix_millis");
        assert_eq!(format, TimestampFormat::UnixMillis);

        let format: TimestampFormat =
            serde_json::from_str(r#"{"custom":"%Y-%m-%d"}"#).expect("deserialize custom");
        assert_eq!(format, TimestampFormat::Custom("%Y-%m-%d".to_string()));
    }
}
