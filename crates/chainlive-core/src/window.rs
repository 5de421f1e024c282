//! Recency window: a bounded, most-recent-first sequence.

use std::collections::VecDeque;

/// Default number of entries kept per window.
pub const DEFAULT_CAPACITY: usize = 20;

/// Keeps the last N items, newest at the front.
///
/// Pushing beyond capacity evicts from the back, so the oldest entry is always
/// the one that goes.
#[derive(Debug, Clone)]
pub struct RecencyWindow<T> {
    /// Newest first.
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RecencyWindow<T> {
    /// Create a window holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend one item, evicting the oldest on overflow.
    pub fn push(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    /// Prepend a batch, keeping the batch's own order at the front.
    ///
    /// `[a, b]` pushed onto `[x, y]` gives `[a, b, x, y]`, then truncated.
    pub fn extend_front(&mut self, batch: impl IntoIterator<Item = T>) {
        let batch: Vec<T> = batch.into_iter().collect();
        for item in batch.into_iter().rev() {
            self.items.push_front(item);
        }
        self.items.truncate(self.capacity);
    }

    /// The newest item.
    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Owned copy of the contents, newest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for RecencyWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
