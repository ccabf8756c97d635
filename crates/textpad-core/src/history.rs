//! Bounded undo/redo history for a single buffer.
//!
//! Each step records the exact text removed and inserted at a character offset, plus the cursor
//! state on both sides of the edit. Replaying a step backwards restores the previous content and
//! cursors exactly.

use crate::buffer::{Position, Selection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CursorSnapshot {
    pub(crate) cursor: Position,
    pub(crate) selection: Option<Selection>,
    pub(crate) secondary: Vec<Position>,
}

#[derive(Debug, Clone)]
pub(crate) struct TextEdit {
    /// Character offset where the edit starts (identical before and after the edit).
    pub(crate) start: usize,
    pub(crate) deleted_text: String,
    pub(crate) inserted_text: String,
}

impl TextEdit {
    pub(crate) fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    pub(crate) fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct UndoStep {
    pub(crate) edit: TextEdit,
    pub(crate) before: CursorSnapshot,
    pub(crate) after: CursorSnapshot,
}

#[derive(Debug)]
pub(crate) struct UndoRedoManager {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
}

impl UndoRedoManager {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo: max_undo.max(1),
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub(crate) fn set_limit(&mut self, max_undo: usize) {
        self.max_undo = max_undo.max(1);
        self.enforce_limit();
    }

    /// Record a fresh edit. Any redo history is discarded.
    pub(crate) fn push_step(&mut self, step: UndoStep) {
        if !self.redo_stack.is_empty() {
            log::debug!("discarding {} redo step(s)", self.redo_stack.len());
            self.redo_stack.clear();
        }
        self.undo_stack.push(step);
        self.enforce_limit();
    }

    pub(crate) fn pop_undo(&mut self) -> Option<UndoStep> {
        self.undo_stack.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<UndoStep> {
        self.redo_stack.pop()
    }

    /// Park an undone step so it can be redone.
    pub(crate) fn push_redo(&mut self, step: UndoStep) {
        self.redo_stack.push(step);
    }

    /// Return a redone step to the undo stack without touching the redo stack.
    pub(crate) fn push_undone(&mut self, step: UndoStep) {
        self.undo_stack.push(step);
        self.enforce_limit();
    }

    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn enforce_limit(&mut self) {
        if self.undo_stack.len() > self.max_undo {
            let excess = self.undo_stack.len() - self.max_undo;
            self.undo_stack.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(start: usize, inserted: &str) -> UndoStep {
        let snapshot = CursorSnapshot {
            cursor: Position::new(0, 0),
            selection: None,
            secondary: Vec::new(),
        };
        UndoStep {
            edit: TextEdit {
                start,
                deleted_text: String::new(),
                inserted_text: inserted.to_string(),
            },
            before: snapshot.clone(),
            after: snapshot,
        }
    }

    #[test]
    fn oldest_steps_are_dropped_past_the_limit() {
        let mut history = UndoRedoManager::new(2);
        history.push_step(step(0, "a"));
        history.push_step(step(1, "b"));
        history.push_step(step(2, "c"));

        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.pop_undo().unwrap().edit.inserted_text, "c");
        assert_eq!(history.pop_undo().unwrap().edit.inserted_text, "b");
        assert!(history.pop_undo().is_none());
    }

    #[test]
    fn new_step_truncates_redo() {
        let mut history = UndoRedoManager::new(10);
        history.push_step(step(0, "a"));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.push_step(step(0, "b"));
        assert!(!history.can_redo());
        assert_eq!(history.redo_depth(), 0);
    }
}
