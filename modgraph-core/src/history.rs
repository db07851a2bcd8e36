//! Undo/redo stacks of applied actions.
//!
//! Unlike snapshot-based undo, the stacks hold the actions themselves; each
//! knows how to revert and replay its own edit against the pool.

use std::collections::VecDeque;

use modgraph_types::{Action, ActionError, Pool};

pub const DEFAULT_MAX_DEPTH: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    undo_stack: VecDeque<Action>,
    redo_stack: VecDeque<Action>,
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Rebuild from persisted stacks, oldest action first in each.
    pub fn from_stacks(undo: Vec<Action>, redo: Vec<Action>, max_depth: usize) -> Self {
        let mut history = Self::new(max_depth);
        history.undo_stack = undo.into();
        history.redo_stack = redo.into();
        history.trim();
        history
    }

    /// Apply `action` for the first time and record it. Clears the redo stack.
    ///
    /// A failed action is not recorded and the pool is left as it was.
    pub fn append(&mut self, mut action: Action, pool: &mut Pool) -> Result<(), ActionError> {
        action.forward(pool, true)?;
        log::debug!(target: "history", "applied {}", action.action_type());
        self.undo_stack.push_back(action);
        self.redo_stack.clear();
        self.trim();
        Ok(())
    }

    /// Revert the most recent action. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, pool: &mut Pool) -> Result<bool, ActionError> {
        let Some(mut action) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = action.backward(pool) {
            log::error!(target: "history", "undo of {} failed: {}", action.action_type(), e);
            self.undo_stack.push_back(action);
            return Err(e);
        }
        log::debug!(target: "history", "undid {}", action.action_type());
        self.redo_stack.push_back(action);
        Ok(true)
    }

    /// Replay the most recently undone action. `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, pool: &mut Pool) -> Result<bool, ActionError> {
        let Some(mut action) = self.redo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = action.forward(pool, false) {
            log::error!(target: "history", "redo of {} failed: {}", action.action_type(), e);
            self.redo_stack.push_back(action);
            return Err(e);
        }
        log::debug!(target: "history", "redid {}", action.action_type());
        self.undo_stack.push_back(action);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Applied actions, oldest first.
    pub fn undo_actions(&self) -> impl DoubleEndedIterator<Item = &Action> + '_ {
        self.undo_stack.iter()
    }

    /// Undone actions, oldest undo first; the next redo is the last item.
    pub fn redo_actions(&self) -> impl DoubleEndedIterator<Item = &Action> + '_ {
        self.redo_stack.iter()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        while self.redo_stack.len() > self.max_depth {
            self.redo_stack.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
