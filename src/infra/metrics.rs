//! Lock-free scan metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Lock-free scan metrics collector
pub struct Metrics {
    /// Codes submitted to the orchestrator (monotonic)
    submitted_total: AtomicU64,
    /// Submissions ignored by the suppression window (monotonic)
    suppressed_total: AtomicU64,
    /// Submissions rejected while another code was in flight (monotonic)
    rejected_busy_total: AtomicU64,
    /// Validation rejections (monotonic)
    invalid_total: AtomicU64,
    /// Successful commits (monotonic)
    committed_total: AtomicU64,
    /// Commit rejections (monotonic)
    commit_failed_total: AtomicU64,
    /// Gateway transport/backend failures (monotonic)
    gateway_errors_total: AtomicU64,
    /// Resolved attempts since last report (reset on report)
    attempts_since_report: AtomicU64,
    /// Sum of attempt latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max attempt latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            submitted_total: AtomicU64::new(0),
            suppressed_total: AtomicU64::new(0),
            rejected_busy_total: AtomicU64::new(0),
            invalid_total: AtomicU64::new(0),
            committed_total: AtomicU64::new(0),
            commit_failed_total: AtomicU64::new(0),
            gateway_errors_total: AtomicU64::new(0),
            attempts_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
        }
    }

    pub fn record_submitted(&self) {
        self.submitted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.suppressed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_busy(&self) {
        self.rejected_busy_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self, latency_us: u64) {
        self.invalid_total.fetch_add(1, Ordering::Relaxed);
        self.record_attempt(latency_us);
    }

    pub fn record_committed(&self, latency_us: u64) {
        self.committed_total.fetch_add(1, Ordering::Relaxed);
        self.record_attempt(latency_us);
    }

    pub fn record_commit_failed(&self, latency_us: u64) {
        self.commit_failed_total.fetch_add(1, Ordering::Relaxed);
        self.record_attempt(latency_us);
    }

    pub fn record_gateway_error(&self, latency_us: u64) {
        self.gateway_errors_total.fetch_add(1, Ordering::Relaxed);
        self.record_attempt(latency_us);
    }

    fn record_attempt(&self, latency_us: u64) {
        self.attempts_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
    }

    pub fn submitted_total(&self) -> u64 {
        self.submitted_total.load(Ordering::Relaxed)
    }

    pub fn suppressed_total(&self) -> u64 {
        self.suppressed_total.load(Ordering::Relaxed)
    }

    pub fn committed_total(&self) -> u64 {
        self.committed_total.load(Ordering::Relaxed)
    }

    /// Produce a report snapshot, resetting the since-report counters
    pub fn report(&self) -> MetricsSummary {
        let attempts = self.attempts_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_us.swap(0, Ordering::Relaxed);
        let avg_latency_us = if attempts > 0 { latency_sum / attempts } else { 0 };

        MetricsSummary {
            submitted_total: self.submitted_total.load(Ordering::Relaxed),
            suppressed_total: self.suppressed_total.load(Ordering::Relaxed),
            rejected_busy_total: self.rejected_busy_total.load(Ordering::Relaxed),
            invalid_total: self.invalid_total.load(Ordering::Relaxed),
            committed_total: self.committed_total.load(Ordering::Relaxed),
            commit_failed_total: self.commit_failed_total.load(Ordering::Relaxed),
            gateway_errors_total: self.gateway_errors_total.load(Ordering::Relaxed),
            attempts,
            avg_latency_us,
            max_latency_us: latency_max,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at report time
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub submitted_total: u64,
    pub suppressed_total: u64,
    pub rejected_busy_total: u64,
    pub invalid_total: u64,
    pub committed_total: u64,
    pub commit_failed_total: u64,
    pub gateway_errors_total: u64,
    pub attempts: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            submitted = %self.submitted_total,
            suppressed = %self.suppressed_total,
            rejected_busy = %self.rejected_busy_total,
            invalid = %self.invalid_total,
            committed = %self.committed_total,
            commit_failed = %self.commit_failed_total,
            gateway_errors = %self.gateway_errors_total,
            attempts = %self.attempts,
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            "scan_metrics"
        );
    }
}
