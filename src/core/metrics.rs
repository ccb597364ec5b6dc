//! Publisher metrics for observability
//!
//! Counters for monitoring pipeline health: how much was buffered, how
//! much reached the collector, and how much was lost to overflow or to
//! the retry cap.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for publisher observability
///
/// # Example
///
/// ```
/// use client_telemetry::PublisherMetrics;
///
/// let metrics = PublisherMetrics::new();
/// metrics.record_buffered();
/// metrics.record_delivered(1);
///
/// assert_eq!(metrics.records_buffered(), 1);
/// assert_eq!(metrics.records_delivered(), 1);
/// ```
#[derive(Debug)]
pub struct PublisherMetrics {
    /// Records accepted into a category buffer
    records_buffered: AtomicU64,

    /// Records dropped because a buffer was over its cap
    overflow_dropped: AtomicU64,

    /// Flushes that had something to send
    flushes_attempted: AtomicU64,

    /// Flushes whose payload some transport accepted
    flushes_succeeded: AtomicU64,

    /// Flushes where every transport failed
    flushes_failed: AtomicU64,

    /// Records accepted by a transport
    records_delivered: AtomicU64,

    /// Records put back after a failed flush
    records_requeued: AtomicU64,

    /// Records given up on after the retry cap
    records_discarded: AtomicU64,

    /// Individual transport failures, including ones recovered by failover
    transport_failures: AtomicU64,

    /// Timer ticks skipped because a flush was still outstanding
    ticks_skipped: AtomicU64,
}

impl PublisherMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_buffered: AtomicU64::new(0),
            overflow_dropped: AtomicU64::new(0),
            flushes_attempted: AtomicU64::new(0),
            flushes_succeeded: AtomicU64::new(0),
            flushes_failed: AtomicU64::new(0),
            records_delivered: AtomicU64::new(0),
            records_requeued: AtomicU64::new(0),
            records_discarded: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_buffered(&self) -> u64 {
        self.records_buffered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn overflow_dropped(&self) -> u64 {
        self.overflow_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes_attempted(&self) -> u64 {
        self.flushes_attempted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes_succeeded(&self) -> u64 {
        self.flushes_succeeded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes_failed(&self) -> u64 {
        self.flushes_failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_delivered(&self) -> u64 {
        self.records_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_requeued(&self) -> u64 {
        self.records_requeued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_discarded(&self) -> u64 {
        self.records_discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_buffered(&self) -> u64 {
        self.records_buffered.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the running total after adding `count`
    #[inline]
    pub fn record_overflow(&self, count: usize) -> u64 {
        self.overflow_dropped
            .fetch_add(count as u64, Ordering::Relaxed)
            + count as u64
    }

    #[inline]
    pub fn record_flush_attempt(&self) -> u64 {
        self.flushes_attempted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush_success(&self) -> u64 {
        self.flushes_succeeded.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush_failure(&self) -> u64 {
        self.flushes_failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self, count: usize) -> u64 {
        self.records_delivered
            .fetch_add(count as u64, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_requeued(&self, count: usize) -> u64 {
        self.records_requeued
            .fetch_add(count as u64, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded(&self, count: usize) -> u64 {
        self.records_discarded
            .fetch_add(count as u64, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_transport_failure(&self) -> u64 {
        self.transport_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_tick_skipped(&self) -> u64 {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of flushed-or-lost records that never reached the collector,
    /// as a percentage (0.0 - 100.0)
    pub fn loss_rate(&self) -> f64 {
        let lost = (self.overflow_dropped() + self.records_discarded()) as f64;
        let total = self.records_delivered() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_buffered.store(0, Ordering::Relaxed);
        self.overflow_dropped.store(0, Ordering::Relaxed);
        self.flushes_attempted.store(0, Ordering::Relaxed);
        self.flushes_succeeded.store(0, Ordering::Relaxed);
        self.flushes_failed.store(0, Ordering::Relaxed);
        self.records_delivered.store(0, Ordering::Relaxed);
        self.records_requeued.store(0, Ordering::Relaxed);
        self.records_discarded.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.ticks_skipped.store(0, Ordering::Relaxed);
    }
}

impl Default for PublisherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PublisherMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_buffered: AtomicU64::new(self.records_buffered()),
            overflow_dropped: AtomicU64::new(self.overflow_dropped()),
            flushes_attempted: AtomicU64::new(self.flushes_attempted()),
            flushes_succeeded: AtomicU64::new(self.flushes_succeeded()),
            flushes_failed: AtomicU64::new(self.flushes_failed()),
            records_delivered: AtomicU64::new(self.records_delivered()),
            records_requeued: AtomicU64::new(self.records_requeued()),
            records_discarded: AtomicU64::new(self.records_discarded()),
            transport_failures: AtomicU64::new(self.transport_failures()),
            ticks_skipped: AtomicU64::new(self.ticks_skipped()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = PublisherMetrics::new();
        assert_eq!(metrics.records_buffered(), 0);
        assert_eq!(metrics.records_delivered(), 0);
        assert_eq!(metrics.records_discarded(), 0);
        assert_eq!(metrics.ticks_skipped(), 0);
    }

    #[test]
    fn test_record_overflow_returns_total() {
        let metrics = PublisherMetrics::new();
        assert_eq!(metrics.record_overflow(2), 2);
        assert_eq!(metrics.record_overflow(3), 5);
        assert_eq!(metrics.overflow_dropped(), 5);
    }

    #[test]
    fn test_loss_rate() {
        let metrics = PublisherMetrics::new();
        assert_eq!(metrics.loss_rate(), 0.0);

        metrics.record_delivered(90);
        metrics.record_discarded(5);
        metrics.record_overflow(5);

        let rate = metrics.loss_rate();
        assert!((9.9..=10.1).contains(&rate), "Loss rate was {}", rate);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = PublisherMetrics::new();
        metrics.record_buffered();
        metrics.record_flush_attempt();
        metrics.record_transport_failure();

        metrics.reset();

        assert_eq!(metrics.records_buffered(), 0);
        assert_eq!(metrics.flushes_attempted(), 0);
        assert_eq!(metrics.transport_failures(), 0);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = PublisherMetrics::new();
        metrics.record_delivered(3);

        let snapshot = metrics.clone();
        metrics.record_delivered(1);

        assert_eq!(snapshot.records_delivered(), 3);
        assert_eq!(metrics.records_delivered(), 4);
    }
}
