//! Activity log entries and the sink that records them.
//!
//! These are domain records (who moved what, when), distinct from the diagnostic
//! output emitted through the `log` facade.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of entries returned by [`MemoryLog::query`].
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Number of items listed in [`LogSummary::top_items`].
pub const SUMMARY_TOP_ITEMS: usize = 5;

/// Category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogKind {
    /// Item taken out of its container.
    Retrieval,
    /// Item put at a position.
    Placement,
    /// Item removed from the system.
    Removed,
    /// Item reached its usage limit.
    Depleted,
    /// Item moved between containers.
    Transfer,
    /// Item used in place.
    Usage,
}

impl LogKind {
    /// Lowercase tag used in listings.
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Retrieval => "retrieval",
            LogKind::Placement => "placement",
            LogKind::Removed => "removed",
            LogKind::Depleted => "depleted",
            LogKind::Transfer => "transfer",
            LogKind::Usage => "usage",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded activity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LogEntry {
    /// Item concerned.
    pub item_id: String,
    /// Who performed the action ("system" for automatic actions).
    pub actor: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Container the item was in.
    pub from_container: String,
    /// Container the item ended up in, for moves.
    pub to_container: Option<String>,
    /// Category tag.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: LogKind,
    /// Short summary.
    pub title: String,
    /// Free-text detail.
    pub description: Option<String>,
}

impl LogEntry {
    /// Creates an entry without destination or description.
    pub fn new(
        kind: LogKind,
        item_id: impl Into<String>,
        actor: impl Into<String>,
        timestamp: DateTime<Utc>,
        from_container: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            actor: actor.into(),
            timestamp,
            from_container: from_container.into(),
            to_container: None,
            kind,
            title: title.into(),
            description: None,
        }
    }

    /// Sets the destination container.
    pub fn with_destination(mut self, container_id: impl Into<String>) -> Self {
        self.to_container = Some(container_id.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Destination for activity entries.
pub trait LogSink {
    /// Records one entry.
    fn append(&mut self, entry: LogEntry);
}

/// Criteria for [`MemoryLog::query`]. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Only entries at or after this instant.
    pub start: Option<DateTime<Utc>>,
    /// Only entries at or before this instant.
    pub end: Option<DateTime<Utc>>,
    /// Only entries about this item.
    pub item_id: Option<String>,
    /// Only entries by this actor.
    pub actor: Option<String>,
    /// Only entries of this kind.
    pub kind: Option<LogKind>,
    /// Maximum entries returned (default 100).
    pub limit: Option<usize>,
}

impl LogFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        self.start.map_or(true, |start| entry.timestamp >= start)
            && self.end.map_or(true, |end| entry.timestamp <= end)
            && self
                .item_id
                .as_deref()
                .map_or(true, |id| entry.item_id == id)
            && self
                .actor
                .as_deref()
                .map_or(true, |actor| entry.actor == actor)
            && self.kind.map_or(true, |kind| entry.kind == kind)
    }
}

/// Entry count for one item in a [`LogSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ItemActivity {
    /// Item identifier.
    pub item_id: String,
    /// Entries about the item in the window.
    pub count: usize,
}

/// Totals over the entries in a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LogSummary {
    /// Window start, inclusive.
    pub start: DateTime<Utc>,
    /// Window end, inclusive.
    pub end: DateTime<Utc>,
    /// Entries in the window.
    pub total: usize,
    /// Entries per kind.
    pub by_kind: BTreeMap<LogKind, usize>,
    /// Entries per source container.
    pub by_container: BTreeMap<String, usize>,
    /// Entries per actor.
    pub by_actor: BTreeMap<String, usize>,
    /// Most logged items, highest count first. Ties keep first-seen order.
    pub top_items: Vec<ItemActivity>,
}

/// Log sink that keeps entries in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    entries: Vec<LogEntry>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching the filter, newest first, truncated to the filter's limit.
    pub fn query(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        let mut matched: Vec<&LogEntry> =
            self.entries.iter().filter(|e| filter.matches(e)).collect();
        // Reversing a stable sort puts later inserts first among equal timestamps.
        matched.sort_by_key(|e| e.timestamp);
        matched.reverse();
        matched.truncate(filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT));
        matched
    }

    /// Counts the entries in `[start, end]` by kind, source container and actor,
    /// and lists the most logged items.
    pub fn summary(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> LogSummary {
        let mut summary = LogSummary {
            start,
            end,
            total: 0,
            by_kind: BTreeMap::new(),
            by_container: BTreeMap::new(),
            by_actor: BTreeMap::new(),
            top_items: Vec::new(),
        };
        let mut items: Vec<ItemActivity> = Vec::new();

        for entry in self
            .entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
        {
            summary.total += 1;
            *summary.by_kind.entry(entry.kind).or_default() += 1;
            *summary
                .by_container
                .entry(entry.from_container.clone())
                .or_default() += 1;
            *summary.by_actor.entry(entry.actor.clone()).or_default() += 1;

            if entry.item_id.is_empty() {
                continue;
            }
            match items.iter_mut().find(|a| a.item_id == entry.item_id) {
                Some(activity) => activity.count += 1,
                None => items.push(ItemActivity {
                    item_id: entry.item_id.clone(),
                    count: 1,
                }),
            }
        }

        // Stable sort keeps first-seen order among equal counts.
        items.sort_by(|a, b| b.count.cmp(&a.count));
        items.truncate(SUMMARY_TOP_ITEMS);
        summary.top_items = items;
        summary
    }
}

impl LogSink for MemoryLog {
    fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }
}

impl<T: LogSink + ?Sized> LogSink for &mut T {
    fn append(&mut self, entry: LogEntry) {
        (**self).append(entry);
    }
}
