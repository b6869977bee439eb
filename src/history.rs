use std::collections::VecDeque;

use log::debug;

use crate::document::{Document, Snapshot};

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Snapshot-based undo/redo.
///
/// A gesture calls [`HistoryManager::begin_interaction`] once, before its
/// first mutation, mutates the document freely and ends with
/// [`HistoryManager::commit`]. The checkpoint pushed at the start is the one
/// undo step for the whole gesture.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
    /// Document revision when the open checkpoint was taken
    pending: Option<u64>,
    clean_revision: u64,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl HistoryManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            pending: None,
            clean_revision: 0,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Checkpoints the current document and forgets the redo branch.
    pub fn begin_interaction(&mut self, document: &Document) {
        if self.pending.is_some() {
            debug!("begin_interaction called with a checkpoint still open");
        }

        self.undo_stack.push_back(document.snapshot());
        self.redo_stack.clear();
        self.pending = Some(document.revision());
    }

    /// Finalizes the open gesture. A gesture that left the document unchanged
    /// does not leave an undo step behind.
    pub fn commit(&mut self, document: &Document) {
        let Some(started_at) = self.pending.take() else {
            return;
        };

        let unchanged = document.revision() == started_at
            || self.undo_stack.back().is_some_and(|checkpoint| *checkpoint == document.snapshot());
        if unchanged {
            self.undo_stack.pop_back();
            debug!("Gesture made no changes, dropping checkpoint");
        } else {
            while self.undo_stack.len() > self.max_depth {
                self.undo_stack.pop_front();
            }
            debug!("Committed history step ({} undoable)", self.undo_stack.len());
        }
        self.clean_revision = document.revision();
    }

    /// Rolls the document back to the open checkpoint and discards it
    pub fn abort_interaction(&mut self, document: &mut Document) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        let Some(checkpoint) = self.undo_stack.pop_back() else {
            return false;
        };
        document.restore(checkpoint);
        self.clean_revision = document.revision();
        debug!("Gesture aborted, document restored");
        true
    }

    pub fn is_interaction_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the document changed since the last commit, undo or redo
    pub fn is_dirty(&self, document: &Document) -> bool {
        document.revision() != self.clean_revision
    }

    pub fn undo(&mut self, document: &mut Document) -> bool {
        if self.pending.is_some() {
            debug!("Ignoring undo during an open gesture");
            return false;
        }
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        self.redo_stack.push(document.snapshot());
        document.restore(previous);
        self.clean_revision = document.revision();
        debug!("Undo: restored previous state");
        true
    }

    pub fn redo(&mut self, document: &mut Document) -> bool {
        if self.pending.is_some() {
            debug!("Ignoring redo during an open gesture");
            return false;
        }
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push_back(document.snapshot());
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        document.restore(next);
        self.clean_revision = document.revision();
        debug!("Redo: restored next state");
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }

    /// Forgets all history and treats `document` as unmodified
    pub fn reset(&mut self, document: &Document) {
        self.clear();
        self.clean_revision = document.revision();
    }
}
