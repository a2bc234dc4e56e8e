//! Bounded undo history on top of the reducer.

use std::collections::VecDeque;

use super::{apply, Action};
use crate::models::Snapshot;

pub const DEFAULT_UNDO_DEPTH: usize = 20;

/// The current snapshot plus the snapshots it replaced, newest last.
///
/// `LoadState` and `Reset` start a fresh history. Actions that leave the snapshot
/// unchanged are not recorded.
#[derive(Debug, Clone)]
pub struct History {
    present: Snapshot,
    past: VecDeque<Snapshot>,
    depth: usize,
}

impl History {
    pub fn new(present: Snapshot, depth: usize) -> Self {
        Self {
            present,
            past: VecDeque::new(),
            depth,
        }
    }

    /// Resume a history persisted elsewhere. `past` is oldest first; only the
    /// newest `depth` entries are kept.
    pub fn with_past(present: Snapshot, past: Vec<Snapshot>, depth: usize) -> Self {
        let mut past = VecDeque::from(past);
        while past.len() > depth {
            past.pop_front();
        }
        Self {
            present,
            past,
            depth,
        }
    }

    /// Snapshots undo can return to, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &Snapshot> {
        self.past.iter()
    }

    pub fn present(&self) -> &Snapshot {
        &self.present
    }

    pub fn into_present(self) -> Snapshot {
        self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    /// Apply `action` to the present snapshot.
    pub fn dispatch(&mut self, action: Action) {
        if action.replaces_snapshot() {
            self.present = apply(&self.present, action);
            self.past.clear();
            return;
        }

        let next = apply(&self.present, action);
        if next == self.present {
            return;
        }
        let previous = std::mem::replace(&mut self.present, next);
        if self.depth == 0 {
            return;
        }
        if self.past.len() == self.depth {
            self.past.pop_front();
        }
        self.past.push_back(previous);
    }

    /// Restore the snapshot before the last recorded action. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.past.pop_back() {
            Some(previous) => {
                self.present = previous;
                true
            }
            None => false,
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Snapshot::default(), DEFAULT_UNDO_DEPTH)
    }
}
