//! Duplicate-scan suppression
//!
//! A code that was just processed must not re-enter validation when the
//! camera loop re-decodes the same frame or an attendee re-presents the
//! same ticket seconds later. Entries carry their own deadline; cleanup is
//! lazy on each lookup, no background timer.

use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Recently processed codes and their suppression deadlines
pub struct SuppressionList {
    entries: FxHashMap<String, Instant>,
}

impl SuppressionList {
    pub fn new() -> Self {
        Self { entries: FxHashMap::default() }
    }

    /// Suppress a code for the given window
    pub fn note(&mut self, code: &str, window: Duration) {
        let expires_at = Instant::now() + window;
        debug!(code = %code, window_ms = %window.as_millis(), "code_suppressed");
        self.entries.insert(code.to_string(), expires_at);
    }

    /// True if the code has an unexpired entry
    pub fn contains(&self, code: &str) -> bool {
        match self.entries.get(code) {
            Some(expires_at) => *expires_at > Instant::now(),
            None => false,
        }
    }

    /// Drop expired entries
    pub fn evict_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, expires_at| *expires_at > now);
    }

    /// Forget everything (a fresh session starts empty)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SuppressionList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_and_contains() {
        let mut list = SuppressionList::new();

        list.note("TICKET-1", Duration::from_secs(10));

        assert!(list.contains("TICKET-1"));
        assert!(!list.contains("TICKET-2"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_expired_entry_not_contained() {
        let mut list = SuppressionList::new();

        // Backdated entry, already past its deadline
        list.entries
            .insert("TICKET-1".to_string(), Instant::now() - Duration::from_secs(1));

        assert!(!list.contains("TICKET-1"));
        // Entry still present until eviction runs
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_evict_expired() {
        let mut list = SuppressionList::new();

        list.entries
            .insert("OLD".to_string(), Instant::now() - Duration::from_secs(60));
        list.note("FRESH", Duration::from_secs(10));

        list.evict_expired();

        assert_eq!(list.len(), 1);
        assert!(list.contains("FRESH"));
        assert!(!list.contains("OLD"));
    }

    #[test]
    fn test_renote_extends_window() {
        let mut list = SuppressionList::new();

        list.entries
            .insert("TICKET-1".to_string(), Instant::now() - Duration::from_secs(1));
        assert!(!list.contains("TICKET-1"));

        list.note("TICKET-1", Duration::from_secs(10));
        assert!(list.contains("TICKET-1"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut list = SuppressionList::new();
        list.note("TICKET-1", Duration::from_secs(10));
        list.note("TICKET-2", Duration::from_secs(10));

        list.clear();

        assert!(list.is_empty());
        assert!(!list.contains("TICKET-1"));
    }
}
