//! Min-ordered index of pending deadlines.
//!
//! The index is advisory. Entries are pushed whenever a record's deadline
//! is set and are never removed or adjusted afterwards, so an alias that
//! was re-armed, renamed away or deleted leaves older entries behind.
//! Whoever pops an entry compares its version with the live record and
//! drops it on mismatch.
//!
//! ```text
//!   push (log n)            pop_min (log n)
//!        │                        │
//!        ▼                        ▼
//!   ┌──────────────────────────────────────┐
//!   │ BinaryHeap<Reverse<IndexEntry>>      │
//!   │   ordered by (expires_at, seq)       │
//!   └──────────────────────────────────────┘
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

/// A deadline as it was when pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub alias: String,
    pub expires_at: Instant,
    pub version: u64,
    /// Insertion sequence, breaks ties between equal deadlines
    seq: u64,
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of `(alias, expires_at, version)` with the earliest
/// deadline on top.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    heap: BinaryHeap<Reverse<IndexEntry>>,
    next_seq: u64,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn push(&mut self, alias: impl Into<String>, expires_at: Instant, version: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(IndexEntry {
            alias: alias.into(),
            expires_at,
            version,
            seq,
        }));
    }

    /// The entry with the earliest deadline.
    pub fn peek_min(&self) -> Option<&IndexEntry> {
        self.heap.peek().map(|Reverse(entry)| entry)
    }

    /// Removes and returns the entry with the earliest deadline.
    pub fn pop_min(&mut self) -> Option<IndexEntry> {
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    /// Pops the earliest entry only if its deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<IndexEntry> {
        match self.peek_min() {
            Some(entry) if entry.expires_at <= now => self.pop_min(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pops_in_deadline_order() {
        let base = Instant::now();
        let mut index = ExpiryIndex::new();

        index.push("c", base + Duration::from_secs(3), 0);
        index.push("a", base + Duration::from_secs(1), 0);
        index.push("b", base + Duration::from_secs(2), 0);

        assert_eq!(index.len(), 3);
        assert_eq!(index.peek_min().map(|e| e.alias.as_str()), Some("a"));

        let order: Vec<String> = std::iter::from_fn(|| index.pop_min())
            .map(|e| e.alias)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let deadline = Instant::now();
        let mut index = ExpiryIndex::new();

        index.push("first", deadline, 0);
        index.push("second", deadline, 0);
        index.push("third", deadline, 0);

        assert_eq!(index.pop_min().unwrap().alias, "first");
        assert_eq!(index.pop_min().unwrap().alias, "second");
        assert_eq!(index.pop_min().unwrap().alias, "third");
    }

    #[test]
    fn test_pop_due_stops_at_future_entries() {
        let base = Instant::now();
        let mut index = ExpiryIndex::new();

        index.push("due", base, 0);
        index.push("later", base + Duration::from_secs(10), 0);

        assert_eq!(index.pop_due(base).unwrap().alias, "due");
        assert!(index.pop_due(base).is_none());
        assert_eq!(index.len(), 1);

        let entry = index.pop_due(base + Duration::from_secs(10)).unwrap();
        assert_eq!(entry.alias, "later");
    }

    #[test]
    fn test_keeps_every_version() {
        let base = Instant::now();
        let mut index = ExpiryIndex::new();

        index.push("y", base + Duration::from_secs(100), 0);
        index.push("y", base + Duration::from_secs(1), 1);

        let first = index.pop_min().unwrap();
        assert_eq!((first.alias.as_str(), first.version), ("y", 1));
        let second = index.pop_min().unwrap();
        assert_eq!((second.alias.as_str(), second.version), ("y", 0));
    }

    #[test]
    fn test_empty() {
        let mut index = ExpiryIndex::new();
        assert!(index.peek_min().is_none());
        assert!(index.pop_min().is_none());
        assert!(index.pop_due(Instant::now()).is_none());
    }
}
