//! Delivery engine
//!
//! The publisher owns one buffer and one retry counter per category. A
//! periodic tick extracts up to `maximum_batch_size` records from every
//! buffer into a single payload and walks the transport chain until one
//! transport accepts it. If every transport fails, each category's batch
//! goes back to the front of its buffer, unless that category has now
//! failed `maximum_consecutive_retries` times in a row, in which case the
//! batch is dropped and its counter starts over.
//!
//! At most one timer-driven flush is in flight at any moment; a tick that
//! fires while the previous flush is still waiting on a transport does
//! nothing.

use super::{
    config::PublisherConfig,
    error::{Result, TelemetryError},
    metrics::PublisherMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    payload::{Payload, Record},
    transport::Transport,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Category written by [`Logger`](crate::Logger)
pub const LOGS_CATEGORY: &str = "logs";

/// Category written by [`StatsRecorder`](crate::StatsRecorder)
pub const STATS_CATEGORY: &str = "stats";

/// Append capability handed to emitters.
///
/// Emitters never see buffers; they can only add to them.
pub trait RecordSink: Send + Sync {
    fn add_to_bucket(&self, category: &str, record: Record);
}

#[derive(Debug, Default)]
struct Bucket {
    records: VecDeque<Record>,
    retries: u32,
}

/// Outcome of a flush that did not exhaust the transport chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records accepted by the collector
    pub delivered: usize,
    /// Name of the transport that accepted the payload
    pub transport: Option<String>,
}

impl FlushReport {
    /// Nothing was buffered, so nothing was sent
    pub fn is_noop(&self) -> bool {
        self.transport.is_none()
    }
}

/// How often shutdown checks whether a scheduled flush has finished
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resets the in-flight flag even if the flush task unwinds
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Publisher {
    config: PublisherConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
    transports: RwLock<Vec<Arc<dyn Transport>>>,
    flush_in_progress: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
    metrics: PublisherMetrics,
    on_overflow: Option<OverflowCallback>,
}

impl Publisher {
    /// Create a publisher with the given configuration and no transports
    pub fn new(config: PublisherConfig) -> Result<Arc<Self>> {
        PublisherBuilder::new().config(config).build()
    }

    /// Create a builder for Publisher
    ///
    /// # Example
    /// ```
    /// use client_telemetry::Publisher;
    /// use std::time::Duration;
    ///
    /// let publisher = Publisher::builder()
    ///     .publish_interval(Duration::from_secs(5))
    ///     .maximum_batch_size(100)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(publisher.config().maximum_batch_size, 100);
    /// ```
    #[must_use]
    pub fn builder() -> PublisherBuilder {
        PublisherBuilder::new()
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PublisherMetrics {
        &self.metrics
    }

    /// Append a record to `category`, creating its buffer on first use
    pub fn add_to_bucket(&self, category: &str, record: Record) {
        let dropped = {
            let mut buckets = self.buckets.lock();
            let bucket = buckets.entry(category.to_string()).or_default();
            bucket.records.push_back(record);
            self.config
                .overflow_policy
                .enforce(&mut bucket.records, self.config.maximum_buffer_size)
        };

        self.metrics.record_buffered();
        if dropped > 0 {
            self.note_overflow(category, dropped);
        }
    }

    /// Append a transport to the end of the chain
    pub fn add_transport(&self, transport: Arc<dyn Transport>) {
        self.transports.write().push(transport);
    }

    /// Insert a transport at `position` (clamped to the chain length).
    /// Position 0 is tried first.
    pub fn insert_transport(&self, position: usize, transport: Arc<dyn Transport>) {
        let mut transports = self.transports.write();
        let position = position.min(transports.len());
        transports.insert(position, transport);
    }

    /// Transport names in priority order
    pub fn transport_names(&self) -> Vec<String> {
        self.transports
            .read()
            .iter()
            .map(|transport| transport.name().to_string())
            .collect()
    }

    /// Send one batch from every category through the transport chain.
    ///
    /// Returns `Err(DeliveryFailed)` only when every transport failed; the
    /// batch has then already been requeued or, past the retry cap,
    /// discarded.
    pub async fn flush(&self) -> Result<FlushReport> {
        let payload = self.extract_batch();
        if payload.is_empty() {
            return Ok(FlushReport::default());
        }

        self.metrics.record_flush_attempt();
        let records = payload.record_count();
        let transports: Vec<Arc<dyn Transport>> = self.transports.read().clone();

        for transport in &transports {
            match transport.process(&payload).await {
                Ok(()) => {
                    self.reset_retries();
                    self.metrics.record_flush_success();
                    self.metrics.record_delivered(records);
                    return Ok(FlushReport {
                        delivered: records,
                        transport: Some(transport.name().to_string()),
                    });
                }
                Err(e) => {
                    self.metrics.record_transport_failure();
                    tracing::debug!(
                        transport = transport.name(),
                        error = %e,
                        "transport failed, falling back to next"
                    );
                }
            }
        }

        self.metrics.record_flush_failure();
        self.requeue(payload);
        Err(TelemetryError::delivery_failed(transports.len(), records))
    }

    /// Begin flushing every `publish_interval`.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if the ticker is running, `NoRuntime` outside a
    /// Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return Err(TelemetryError::AlreadyStarted);
        }
        let runtime = Handle::try_current().map_err(|_| TelemetryError::NoRuntime)?;

        let period = self.config.publish_interval();
        let publisher: Weak<Self> = Arc::downgrade(self);
        *ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(publisher) = publisher.upgrade() else {
                    break;
                };
                publisher.tick();
            }
        }));

        tracing::debug!(interval_ms = period.as_millis() as u64, "publisher started");
        Ok(())
    }

    /// Cancel the ticker. An in-flight flush runs to completion.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            tracing::debug!("publisher stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Run one timer tick: spawn a flush unless one is still outstanding.
    ///
    /// Returns `false` when the tick was skipped.
    pub fn tick(self: &Arc<Self>) -> bool {
        if self
            .flush_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.metrics.record_tick_skipped();
            tracing::debug!("previous flush still in flight, skipping tick");
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            self.flush_in_progress.store(false, Ordering::Release);
            tracing::warn!("no Tokio runtime available, skipping tick");
            return false;
        };

        let publisher = Arc::clone(self);
        runtime.spawn(async move {
            let _in_flight = InFlight(&publisher.flush_in_progress);
            if let Err(e) = publisher.flush().await {
                tracing::debug!(error = %e, "scheduled flush failed");
            }
        });
        true
    }

    pub fn is_flush_in_progress(&self) -> bool {
        self.flush_in_progress.load(Ordering::Acquire)
    }

    /// Stop the ticker and make one final, bounded delivery attempt.
    ///
    /// A scheduled flush that is still in flight is allowed to finish
    /// first, so the final flush never sends alongside it. Returns `true`
    /// if the final flush finished without a delivery failure inside
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.stop();

        let final_flush = async {
            while self
                .flush_in_progress
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
            }
            let _in_flight = InFlight(&self.flush_in_progress);
            self.flush().await
        };

        match tokio::time::timeout(timeout, final_flush).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "final flush failed during shutdown");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "final flush did not finish within timeout"
                );
                false
            }
        }
    }

    /// Number of records currently buffered for `category`
    pub fn buffer_len(&self, category: &str) -> usize {
        self.buckets
            .lock()
            .get(category)
            .map_or(0, |bucket| bucket.records.len())
    }

    /// Consecutive failed flushes recorded for `category`
    pub fn retry_count(&self, category: &str) -> u32 {
        self.buckets
            .lock()
            .get(category)
            .map_or(0, |bucket| bucket.retries)
    }

    /// Copy of the records buffered for `category`, oldest first
    pub fn buffered(&self, category: &str) -> Vec<Record> {
        self.buckets
            .lock()
            .get(category)
            .map(|bucket| bucket.records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Categories that have received at least one record
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.buckets.lock().keys().cloned().collect();
        categories.sort();
        categories
    }

    fn extract_batch(&self) -> Payload {
        let batch_size = self.config.maximum_batch_size;
        let mut buckets = self.buckets.lock();
        buckets
            .iter_mut()
            .map(|(category, bucket)| {
                let take = batch_size.min(bucket.records.len());
                (category.clone(), bucket.records.drain(..take).collect())
            })
            .collect()
    }

    fn reset_retries(&self) {
        for bucket in self.buckets.lock().values_mut() {
            bucket.retries = 0;
        }
    }

    fn requeue(&self, payload: Payload) {
        let max_retries = self.config.maximum_consecutive_retries;
        let mut overflowed = Vec::new();

        {
            let mut buckets = self.buckets.lock();
            for (category, records) in payload.into_batches() {
                let bucket = buckets.entry(category.clone()).or_default();
                bucket.retries += 1;

                if bucket.retries < max_retries {
                    self.metrics.record_requeued(records.len());
                    for record in records.into_iter().rev() {
                        bucket.records.push_front(record);
                    }
                    let dropped = self
                        .config
                        .overflow_policy
                        .enforce(&mut bucket.records, self.config.maximum_buffer_size);
                    if dropped > 0 {
                        overflowed.push((category, dropped));
                    }
                } else {
                    bucket.retries = 0;
                    if !records.is_empty() {
                        self.metrics.record_discarded(records.len());
                        tracing::warn!(
                            category = %category,
                            discarded = records.len(),
                            max_retries,
                            "retry limit reached, discarding batch"
                        );
                    }
                }
            }
        }

        for (category, dropped) in overflowed {
            self.note_overflow(&category, dropped);
        }
    }

    /// Track and report overflow. Never called with the bucket lock held,
    /// so the callback may log again.
    fn note_overflow(&self, category: &str, dropped: usize) {
        let total = self.metrics.record_overflow(dropped);
        let previous = total - dropped as u64;

        // Alert on first drop and then once per thousand
        let should_alert = previous == 0 || previous / 1000 != total / 1000;
        if should_alert {
            tracing::warn!(
                category,
                total_dropped = total,
                "buffer full, records dropped; consider a larger maximum_buffer_size"
            );
            if let Some(ref callback) = self.on_overflow {
                callback(category, total);
            }
        }
    }
}

impl RecordSink for Publisher {
    fn add_to_bucket(&self, category: &str, record: Record) {
        Publisher::add_to_bucket(self, category, record);
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }

        let payload = self.extract_batch();
        if payload.is_empty() {
            return;
        }

        // Best-effort last delivery; nothing can be requeued any more
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                records = payload.record_count(),
                "publisher dropped outside a runtime, buffered records lost"
            );
            return;
        };
        let transports: Vec<Arc<dyn Transport>> = self.transports.get_mut().clone();
        runtime.spawn(async move {
            for transport in &transports {
                if transport.process(&payload).await.is_ok() {
                    return;
                }
            }
            tracing::warn!(
                records = payload.record_count(),
                "final delivery failed, buffered records lost"
            );
        });
    }
}

/// Builder for constructing Publisher with a fluent API
///
/// # Example
/// ```
/// use client_telemetry::{OverflowPolicy, Publisher};
/// use std::sync::Arc;
///
/// let publisher = Publisher::builder()
///     .maximum_buffer_size(500)
///     .overflow_policy(OverflowPolicy::DropOldest)
///     .on_overflow(Arc::new(|category, count| {
///         eprintln!("ALERT: {} {} records dropped", count, category);
///     }))
///     .build()
///     .unwrap();
/// # drop(publisher);
/// ```
pub struct PublisherBuilder {
    config: PublisherConfig,
    transports: Vec<Arc<dyn Transport>>,
    on_overflow: Option<OverflowCallback>,
}

impl PublisherBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: PublisherConfig::default(),
            transports: Vec::new(),
            on_overflow: None,
        }
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.config.publish_interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_batch_size(mut self, size: usize) -> Self {
        self.config.maximum_batch_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_buffer_size(mut self, size: usize) -> Self {
        self.config.maximum_buffer_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_consecutive_retries(mut self, retries: u32) -> Self {
        self.config.maximum_consecutive_retries = retries;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Append a transport to the chain
    #[must_use = "builder methods return a new value"]
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transports.push(Arc::new(transport));
        self
    }

    /// Append an already shared transport to the chain
    #[must_use = "builder methods return a new value"]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Set a callback for overflow notifications
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Build the Publisher
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero interval, batch size or buffer size.
    pub fn build(self) -> Result<Arc<Publisher>> {
        self.config.validate()?;

        Ok(Arc::new(Publisher {
            config: self.config,
            buckets: Mutex::new(HashMap::new()),
            transports: RwLock::new(self.transports),
            flush_in_progress: AtomicBool::new(false),
            ticker: Mutex::new(None),
            metrics: PublisherMetrics::new(),
            on_overflow: self.on_overflow,
        }))
    }
}

impl Default for PublisherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
