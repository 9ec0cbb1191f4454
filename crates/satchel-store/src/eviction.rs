//! Expiry-ordered eviction queue for the in-memory store.
//!
//! A min-heap of `(expires, key)` entries. The store never removes an
//! entry by key: deleting or replacing a session leaves its old entry in
//! the heap, and the entry is discarded when it reaches the front. The
//! store tells stale entries apart from live ones by comparing the popped
//! expiry with the one recorded next to the stored value.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

/// A key scheduled for removal at `expires`.
///
/// Field order matters: the derived `Ord` compares `expires` first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EvictionEntry {
    pub(crate) expires: DateTime<Utc>,
    pub(crate) key: String,
}

/// Min-heap of [`EvictionEntry`] values ordered by expiry.
#[derive(Debug, Default)]
pub(crate) struct EvictionQueue {
    heap: BinaryHeap<Reverse<EvictionEntry>>,
}

impl EvictionQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: impl Into<String>, expires: DateTime<Utc>) {
        self.heap.push(Reverse(EvictionEntry {
            expires,
            key: key.into(),
        }));
    }

    /// The entry that expires soonest.
    pub(crate) fn peek(&self) -> Option<&EvictionEntry> {
        self.heap.peek().map(|Reverse(entry)| entry)
    }

    pub(crate) fn pop(&mut self) -> Option<EvictionEntry> {
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    /// Pops the front entry if it expired strictly before `now`.
    pub(crate) fn pop_expired(&mut self, now: DateTime<Utc>) -> Option<EvictionEntry> {
        if self.peek().is_some_and(|entry| entry.expires < now) {
            self.pop()
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
