//! Live activity feed.
//!
//! A bounded, in-memory log of engine actions for operator display. It is not
//! an audit log and is never persisted.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

/// Default number of entries retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Kind of feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedCategory {
    /// General information.
    Info,
    /// Registry or configuration changes.
    System,
    /// An attendance record was written.
    AttendanceMarked,
    /// Something was rejected or needs attention.
    Warning,
}

impl std::fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::System => write!(f, "system"),
            Self::AttendanceMarked => write!(f, "attendance-marked"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveFeedEntry {
    /// Sequence number, increasing per feed.
    pub id: u64,
    /// Human-readable message.
    pub message: String,
    /// Entry kind.
    pub category: FeedCategory,
    /// When the entry was appended.
    pub timestamp: NaiveDateTime,
}

/// Bounded ring buffer of feed entries, oldest first.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    entries: VecDeque<LiveFeedEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LiveFeed {
    /// Create a feed holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append an entry at the tail, evicting from the head when full.
    pub fn append(
        &mut self,
        message: impl Into<String>,
        category: FeedCategory,
        timestamp: NaiveDateTime,
    ) -> &LiveFeedEntry {
        let entry = LiveFeedEntry {
            id: self.next_id,
            message: message.into(),
            category,
            timestamp,
        };
        self.next_id += 1;
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        &self.entries[self.entries.len() - 1]
    }

    /// The last `n` entries, most recent first.
    #[must_use]
    pub fn recent_entries(&self, n: usize) -> Vec<&LiveFeedEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// All retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LiveFeedEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry. Sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Timestamp of the most recent entry.
    #[must_use]
    pub fn last_activity(&self) -> Option<NaiveDateTime> {
        self.entries.back().map(|e| e.timestamp)
    }
}

/// Audio-playback collaborator.
///
/// The engine calls it for each [`FeedCategory::AttendanceMarked`] entry while
/// sound notifications are enabled.
pub trait Notifier: std::fmt::Debug {
    /// Play the attendance chime for `entry`.
    fn attendance_marked(&self, entry: &LiveFeedEntry);
}

/// A notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn attendance_marked(&self, _entry: &LiveFeedEntry) {}
}

/// A notifier that logs instead of playing audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn attendance_marked(&self, entry: &LiveFeedEntry) {
        info!(feed_id = entry.id, "attendance chime: {}", entry.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, minute % 60, 0)
            .unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut feed = LiveFeed::default();
        let first = feed.append("one", FeedCategory::Info, ts(0)).id;
        let second = feed.append("two", FeedCategory::System, ts(1)).id;
        assert!(second > first);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut feed = LiveFeed::default();
        for i in 0..150 {
            feed.append(format!("entry {i}"), FeedCategory::Info, ts(i));
        }

        assert_eq!(feed.len(), 100);
        let oldest: Vec<_> = feed.iter().map(|e| e.message.clone()).collect();
        assert_eq!(oldest.first().map(String::as_str), Some("entry 50"));
        assert_eq!(oldest.last().map(String::as_str), Some("entry 149"));
    }

    #[test]
    fn test_recent_entries_most_recent_first() {
        let mut feed = LiveFeed::default();
        for i in 0..150 {
            feed.append(format!("entry {i}"), FeedCategory::Info, ts(i));
        }

        let recent = feed.recent_entries(3);
        let messages: Vec<_> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["entry 149", "entry 148", "entry 147"]);

        assert_eq!(feed.recent_entries(500).len(), 100);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut feed = LiveFeed::with_capacity(0);
        feed.append("a", FeedCategory::Info, ts(0));
        feed.append("b", FeedCategory::Info, ts(1));
        assert_eq!(feed.capacity(), 1);
        assert_eq!(feed.recent_entries(5)[0].message, "b");
    }

    #[test]
    fn test_clear_and_last_activity() {
        let mut feed = LiveFeed::default();
        assert!(feed.last_activity().is_none());
        feed.append("a", FeedCategory::Warning, ts(7));
        assert_eq!(feed.last_activity(), Some(ts(7)));
        feed.clear();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(FeedCategory::AttendanceMarked.to_string(), "attendance-marked");
        assert_eq!(FeedCategory::System.to_string(), "system");
    }
}
