//! Metric emission
//!
//! Each call becomes one record in the `stats` category:
//! `{"stat": <kind>, "params": [metric, value, tags]}`, where `tags` is
//! the recorder's global tags followed by the call's own.

use super::publisher::{RecordSink, STATS_CATEGORY};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Increment,
    Decrement,
    Gauge,
    Histogram,
    Timing,
    Set,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Increment => "increment",
            StatKind::Decrement => "decrement",
            StatKind::Gauge => "gauge",
            StatKind::Histogram => "histogram",
            StatKind::Timing => "timing",
            StatKind::Set => "set",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric value. `set` stats usually carry text, the rest numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    fn to_json(&self) -> Json {
        match self {
            MetricValue::Int(i) => Json::from(*i),
            MetricValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            MetricValue::Text(s) => Json::String(s.clone()),
        }
    }
}

impl MetricValue {
    /// Counter amount: text that is not a number and non-finite floats
    /// count as 1
    fn counter_amount(self) -> Self {
        match self {
            MetricValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => MetricValue::Text(s),
                _ => MetricValue::Int(1),
            },
            MetricValue::Float(f) if !f.is_finite() => MetricValue::Int(1),
            other => other,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(i: i64) -> Self {
        MetricValue::Int(i)
    }
}

impl From<i32> for MetricValue {
    fn from(i: i32) -> Self {
        MetricValue::Int(i as i64)
    }
}

impl From<u32> for MetricValue {
    fn from(i: u32) -> Self {
        MetricValue::Int(i as i64)
    }
}

impl From<u64> for MetricValue {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(MetricValue::Int)
            .unwrap_or(MetricValue::Float(i as f64))
    }
}

impl From<usize> for MetricValue {
    fn from(i: usize) -> Self {
        MetricValue::from(i as u64)
    }
}

impl From<f64> for MetricValue {
    fn from(f: f64) -> Self {
        MetricValue::Float(f)
    }
}

impl From<std::time::Duration> for MetricValue {
    /// Durations are reported in milliseconds, the unit `timing` expects
    fn from(d: std::time::Duration) -> Self {
        MetricValue::from(d.as_millis() as u64)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

/// Records counters, gauges, histograms, timings and sets
///
/// # Example
///
/// ```
/// use client_telemetry::{Publisher, StatsRecorder};
///
/// let publisher = Publisher::builder().build().unwrap();
/// let stats = StatsRecorder::new(publisher.clone()).with_tags(["region:eu"]);
///
/// stats.increment("checkout.started");
/// stats.timing("checkout.duration", 182, &["step:payment"]);
/// assert_eq!(publisher.buffer_len("stats"), 2);
/// ```
#[derive(Clone)]
pub struct StatsRecorder {
    sink: Arc<dyn RecordSink>,
    global_tags: Vec<String>,
}

impl StatsRecorder {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            sink,
            global_tags: Vec::new(),
        }
    }

    pub fn with_global_tags<I, S>(sink: Arc<dyn RecordSink>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sink,
            global_tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn global_tags(&self) -> &[String] {
        &self.global_tags
    }

    /// Add 1 to `metric`
    pub fn increment(&self, metric: &str) {
        self.record(StatKind::Increment, metric, MetricValue::Int(1), &[]);
    }

    pub fn increment_by(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Increment, metric, value.into().counter_amount(), tags);
    }

    /// Add 1 to `metric` with per-call tags
    pub fn increment_tagged(&self, metric: &str, tags: &[&str]) {
        self.record(StatKind::Increment, metric, MetricValue::Int(1), tags);
    }

    /// Subtract 1 from `metric`
    pub fn decrement(&self, metric: &str) {
        self.record(StatKind::Decrement, metric, MetricValue::Int(1), &[]);
    }

    pub fn decrement_by(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Decrement, metric, value.into().counter_amount(), tags);
    }

    pub fn decrement_tagged(&self, metric: &str, tags: &[&str]) {
        self.record(StatKind::Decrement, metric, MetricValue::Int(1), tags);
    }

    pub fn gauge(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Gauge, metric, value.into(), tags);
    }

    pub fn histogram(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Histogram, metric, value.into(), tags);
    }

    pub fn timing(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Timing, metric, value.into(), tags);
    }

    pub fn set(&self, metric: &str, value: impl Into<MetricValue>, tags: &[&str]) {
        self.record(StatKind::Set, metric, value.into(), tags);
    }

    /// A recorder whose global tags are this one's followed by `tags`
    #[must_use]
    pub fn with_tags<I, S>(&self, tags: I) -> StatsRecorder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut global_tags = self.global_tags.clone();
        global_tags.extend(tags.into_iter().map(Into::into));
        StatsRecorder {
            sink: Arc::clone(&self.sink),
            global_tags,
        }
    }

    fn record(&self, kind: StatKind, metric: &str, value: MetricValue, tags: &[&str]) {
        let all_tags: Vec<&str> = self
            .global_tags
            .iter()
            .map(String::as_str)
            .chain(tags.iter().copied())
            .collect();

        let record = json!({
            "stat": kind.as_str(),
            "params": [metric, value.to_json(), all_tags],
        });
        self.sink.add_to_bucket(STATS_CATEGORY, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CapturingSink {
        records: Mutex<Vec<(String, Json)>>,
    }

    impl RecordSink for CapturingSink {
        fn add_to_bucket(&self, category: &str, record: Json) {
            self.records.lock().push((category.to_string(), record));
        }
    }

    impl CapturingSink {
        fn last(&self) -> Json {
            let records = self.records.lock();
            let (category, record) = records.last().expect("a record");
            assert_eq!(category, STATS_CATEGORY);
            record.clone()
        }
    }

    fn recorder(global_tags: &[&str]) -> (Arc<CapturingSink>, StatsRecorder) {
        let sink = Arc::new(CapturingSink::default());
        let stats = StatsRecorder::with_global_tags(sink.clone(), global_tags.iter().copied());
        (sink, stats)
    }

    #[test]
    fn test_records_each_standard_metric() {
        let (sink, stats) = recorder(&[]);
        let calls: [(StatKind, fn(&StatsRecorder)); 6] = [
            (StatKind::Increment, |s| s.increment_by("metric-name", 5, &[])),
            (StatKind::Decrement, |s| s.decrement_by("metric-name", 5, &[])),
            (StatKind::Gauge, |s| s.gauge("metric-name", 5, &[])),
            (StatKind::Histogram, |s| s.histogram("metric-name", 5, &[])),
            (StatKind::Timing, |s| s.timing("metric-name", 5, &[])),
            (StatKind::Set, |s| s.set("metric-name", 5, &[])),
        ];

        for (kind, call) in calls {
            call(&stats);
            assert_eq!(
                sink.last(),
                json!({"stat": kind.as_str(), "params": ["metric-name", 5, []]})
            );
        }
    }

    #[test]
    fn test_global_tags_come_first() {
        let (sink, stats) = recorder(&["foo:bar"]);

        stats.gauge("metric-name", 5, &["bar:baz"]);
        assert_eq!(
            sink.last(),
            json!({"stat": "gauge", "params": ["metric-name", 5, ["foo:bar", "bar:baz"]]})
        );
    }

    #[test]
    fn test_counters_default_to_one() {
        let (sink, stats) = recorder(&[]);

        stats.increment("metric-name");
        assert_eq!(sink.last()["params"], json!(["metric-name", 1, []]));

        stats.decrement_tagged("metric-name", &["foo:bar"]);
        assert_eq!(
            sink.last(),
            json!({"stat": "decrement", "params": ["metric-name", 1, ["foo:bar"]]})
        );
    }

    #[test]
    fn test_explicit_zero_is_kept() {
        let (sink, stats) = recorder(&[]);
        stats.increment_by("metric-name", 0, &[]);
        assert_eq!(sink.last()["params"][1], json!(0));
    }

    #[test]
    fn test_non_numeric_counter_values_count_as_one() {
        let (sink, stats) = recorder(&[]);

        stats.increment_by("metric-name", "abc", &[]);
        assert_eq!(sink.last()["params"], json!(["metric-name", 1, []]));

        stats.decrement_by("metric-name", f64::NAN, &[]);
        assert_eq!(sink.last()["params"][1], json!(1));

        stats.increment_by("metric-name", f64::INFINITY, &[]);
        assert_eq!(sink.last()["params"][1], json!(1));

        stats.increment_by("metric-name", "7", &[]);
        assert_eq!(sink.last()["params"][1], json!("7"));

        stats.decrement_by("metric-name", 2.5, &[]);
        assert_eq!(sink.last()["params"][1], json!(2.5));
    }

    #[test]
    fn test_with_tags_appends_to_global_tags() {
        let (sink, stats) = recorder(&["foo:bar"]);
        let tagged = stats.with_tags(["bar:baz"]);

        tagged.increment_by("metric-name", 1, &[]);
        assert_eq!(
            sink.last(),
            json!({"stat": "increment", "params": ["metric-name", 1, ["foo:bar", "bar:baz"]]})
        );
        assert_eq!(stats.global_tags(), ["foo:bar"]);
    }

    #[test]
    fn test_value_conversions() {
        let (sink, stats) = recorder(&[]);

        stats.timing("request", Duration::from_millis(250), &[]);
        assert_eq!(sink.last()["params"][1], json!(250));

        stats.set("visitors", "user-42", &[]);
        assert_eq!(sink.last()["params"][1], json!("user-42"));

        stats.histogram("ratio", 0.5, &[]);
        assert_eq!(sink.last()["params"][1], json!(0.5));
    }
}
