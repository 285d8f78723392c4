//! Bounded most-recent-first log of generated images.

use crate::generation::GeneratedImageResult;
use std::collections::VecDeque;

/// Entries kept when no capacity is given.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Most-recent-first list of results, bounded to `capacity` entries.
///
/// Evicted results are handed back from [`HistoryLog::push`]; dropping them
/// releases their image handles unless the caller still holds clones.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<GeneratedImageResult>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    /// Creates an empty log. A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts `result` at the front and returns whatever fell off the back.
    #[must_use = "evicted results hold image handles until dropped"]
    pub fn push(&mut self, result: GeneratedImageResult) -> Vec<GeneratedImageResult> {
        self.entries.push_front(result);
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }
        self.entries.drain(self.capacity..).collect()
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImageResult> {
        self.entries.iter()
    }

    /// The newest entry.
    pub fn latest(&self) -> Option<&GeneratedImageResult> {
        self.entries.front()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every entry and returns them.
    pub fn clear(&mut self) -> Vec<GeneratedImageResult> {
        self.entries.drain(..).collect()
    }
}
