//! Result presentation with timed auto-clear
//!
//! Holds the most recent outcome only; a new result replaces the current
//! one immediately, no queuing. Success results clear faster than failures
//! so the operator can wave the next attendee through, while failures stay
//! long enough for staff to read the reason. Expiry is driven by `tick()`
//! from the orchestrator loop rather than per-result timers, so tests can
//! move deadlines instead of mocking time.

use crate::domain::types::{CheckInRecord, PresentedResult};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// Timed holder for the most recent check-in outcome
pub struct ResultPresenter {
    success_display: Duration,
    failure_display: Duration,
    current: Mutex<Option<PresentedResult>>,
    tx: watch::Sender<Option<PresentedResult>>,
}

impl ResultPresenter {
    pub fn new(success_display: Duration, failure_display: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            success_display,
            failure_display,
            current: Mutex::new(None),
            tx,
        }
    }

    /// Build a presenter from configured display durations (milliseconds)
    pub fn from_millis(success_ms: u64, failure_ms: u64) -> Self {
        Self::new(Duration::from_millis(success_ms), Duration::from_millis(failure_ms))
    }

    /// Observe result changes; `None` means nothing is displayed
    pub fn subscribe(&self) -> watch::Receiver<Option<PresentedResult>> {
        self.tx.subscribe()
    }

    /// The currently displayed result, if any
    pub fn current(&self) -> Option<PresentedResult> {
        self.current.lock().clone()
    }

    /// Display an outcome, replacing whatever is currently shown
    pub fn present(&self, success: bool, message: String, record: Option<CheckInRecord>) {
        let display = if success { self.success_display } else { self.failure_display };
        let result = PresentedResult {
            success,
            message,
            record,
            expires_at: Instant::now() + display,
        };

        *self.current.lock() = Some(result.clone());
        self.tx.send_replace(Some(result));
    }

    /// Force-clear before the deadline, e.g. when a new submit starts
    pub fn clear(&self) {
        if self.current.lock().take().is_some() {
            self.tx.send_replace(None);
        }
    }

    /// Clear the result if its deadline has passed
    pub fn tick(&self) {
        let mut current = self.current.lock();
        let expired = matches!(&*current, Some(result) if result.expires_at <= Instant::now());
        if expired {
            debug!("result_expired");
            *current = None;
            drop(current);
            self.tx.send_replace(None);
        }
    }
}
