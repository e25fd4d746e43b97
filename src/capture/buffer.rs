//! Bounded error log.
//!
//! # Responsibilities
//! - Keep the most recent `capacity` entries in insertion order
//! - Derive counts on demand
//!
//! # Design Decisions
//! - Fixed-capacity `VecDeque`: evicting the oldest entry is O(1) and the
//!   allocation never grows past capacity
//! - Recency is recomputed against the caller's clock on every call; nothing
//!   is cached

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crate::capture::entry::{ErrorCategory, ErrorEntry};

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Counts derived from the buffer contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub recent_count: usize,
    pub counts_by_category: BTreeMap<ErrorCategory, usize>,
}

#[derive(Debug)]
pub struct ErrorBuffer {
    entries: VecDeque<ErrorEntry>,
    capacity: usize,
    recent_window: chrono::Duration,
}

impl ErrorBuffer {
    pub fn new(capacity: usize, recent_window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recent_window: chrono::Duration::from_std(recent_window)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Insert, evicting the oldest entry when full.
    pub fn append(&mut self, entry: ErrorEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self, now: DateTime<Utc>) -> ErrorStats {
        let cutoff = now.checked_sub_signed(self.recent_window);
        let mut stats = ErrorStats {
            total: self.entries.len(),
            ..ErrorStats::default()
        };

        for entry in &self.entries {
            *stats.counts_by_category.entry(entry.category).or_insert(0) += 1;
            if cutoff.map_or(true, |c| entry.timestamp > c) {
                stats.recent_count += 1;
            }
        }
        stats
    }

    /// The `n` most recent entries, newest first.
    pub fn snapshot(&self, n: usize) -> Vec<ErrorEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// All entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }
}

impl Default for ErrorBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RECENT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::entry::EntryContext;
    use serde_json::json;

    fn entry(category: ErrorCategory, seq: usize, at: DateTime<Utc>) -> ErrorEntry {
        ErrorEntry::new(category, json!({ "seq": seq }), EntryContext::default(), at)
    }

    #[test]
    fn test_keeps_last_entries_in_order() {
        let now = Utc::now();
        let mut buffer = ErrorBuffer::default();
        for seq in 0..250 {
            buffer.append(entry(ErrorCategory::LoggedError, seq, now));
        }

        assert_eq!(buffer.len(), 100);
        let seqs: Vec<u64> = buffer
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect();
        let expected: Vec<u64> = (150..250).collect();
        assert_eq!(seqs, expected);
        assert_eq!(buffer.stats(now).total, 100);
    }

    #[test]
    fn test_recent_count_follows_clock() {
        let start = Utc::now();
        let mut buffer = ErrorBuffer::default();
        buffer.append(entry(ErrorCategory::LoggedError, 0, start));
        buffer.append(entry(ErrorCategory::LoggedError, 1, start + chrono::Duration::seconds(120)));
        buffer.append(entry(ErrorCategory::LoggedError, 2, start + chrono::Duration::seconds(240)));

        let probe = start + chrono::Duration::seconds(240);
        assert_eq!(buffer.stats(probe).recent_count, 3);

        // Same buffer, later readings.
        assert_eq!(buffer.stats(start + chrono::Duration::seconds(301)).recent_count, 2);
        assert_eq!(buffer.stats(start + chrono::Duration::seconds(421)).recent_count, 1);
        assert_eq!(buffer.stats(start + chrono::Duration::seconds(600)).recent_count, 0);
        assert_eq!(buffer.stats(start + chrono::Duration::seconds(600)).total, 3);
    }

    #[test]
    fn test_snapshot_is_newest_first() {
        let now = Utc::now();
        let mut buffer = ErrorBuffer::default();
        for seq in 0..5 {
            buffer.append(entry(ErrorCategory::NetworkTransportFailure, seq, now));
        }

        let recent = buffer.snapshot(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].payload["seq"], 4);
        assert_eq!(recent[1].payload["seq"], 3);

        assert_eq!(buffer.snapshot(50).len(), 5);
        assert!(buffer.snapshot(0).is_empty());
    }

    #[test]
    fn test_counts_by_category() {
        let now = Utc::now();
        let mut buffer = ErrorBuffer::new(10, DEFAULT_RECENT_WINDOW);
        buffer.append(entry(ErrorCategory::HttpStatusFailure, 0, now));
        buffer.append(entry(ErrorCategory::HttpStatusFailure, 1, now));
        buffer.append(entry(ErrorCategory::CheckFailure, 2, now));

        let stats = buffer.stats(now);
        assert_eq!(stats.counts_by_category[&ErrorCategory::HttpStatusFailure], 2);
        assert_eq!(stats.counts_by_category[&ErrorCategory::CheckFailure], 1);
        assert!(!stats.counts_by_category.contains_key(&ErrorCategory::LoggedError));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = ErrorBuffer::new(0, DEFAULT_RECENT_WINDOW);
        buffer.append(entry(ErrorCategory::LoggedError, 0, Utc::now()));
        buffer.append(entry(ErrorCategory::LoggedError, 1, Utc::now()));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot(5)[0].payload["seq"], 1);
    }
}
