//! Snapshot history for undo/redo.
//!
//! Every committed change stores a full copy of the element collection. The
//! cursor points at the snapshot currently displayed; committing while the
//! cursor is behind the end discards the redo branch. There is always at
//! least one snapshot, so `current()` is total.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::doc::Element;

#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Element>>,
    cursor: usize,
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(None)
    }
}

impl History {
    /// Empty history holding a single empty snapshot. `limit` caps the number
    /// of snapshots kept; the oldest are dropped first.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self { snapshots: vec![Vec::new()], cursor: 0, limit: limit.map(|l| l.max(1)) }
    }

    /// Record `elements` as the newest snapshot, discarding anything after
    /// the cursor.
    pub fn commit(&mut self, elements: Vec<Element>) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(elements);
        self.cursor = self.snapshots.len() - 1;

        if let Some(limit) = self.limit
            && self.snapshots.len() > limit
        {
            let excess = self.snapshots.len() - limit;
            self.snapshots.drain(..excess);
            self.cursor -= excess;
        }
    }

    /// Step back one snapshot. Returns `false` at the oldest snapshot.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one snapshot. Returns `false` at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// The snapshot under the cursor.
    #[must_use]
    pub fn current(&self) -> &[Element] {
        self.snapshots.get(self.cursor).map_or(&[], Vec::as_slice)
    }

    /// Replace the whole history with a single snapshot.
    pub fn reset(&mut self, elements: Vec<Element>) {
        self.snapshots = vec![elements];
        self.cursor = 0;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Never true: a history always holds at least one snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
