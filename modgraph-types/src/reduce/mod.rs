//! Pure pool reducers for actions.
//!
//! `forward` applies an action, `backward` reverts it. Both check every
//! precondition before touching the pool, so an `Err` means the pool is
//! unchanged. An error here always indicates a caller bug (an action built
//! against a different pool, or replayed out of order); it is reported rather
//! than panicking so the history can refuse the action cleanly.
//!
//! Reducers do NOT:
//! - Push or pop history entries
//! - Emit notifications
//! - Mark documents dirty

mod create;
mod delete;
mod edit;

use std::fmt;

use crate::action::Action;
use crate::entity::EntityType;
use crate::pool::{Pool, PoolError};
use crate::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// A referenced entity is not in the pool.
    Missing(EntityId),
    /// Surfaces are removed with their owning group node, never directly.
    NotDeletable(EntityId),
    WrongKind { id: EntityId, expected: EntityType },
    /// A redo of a delete that was never applied for the first time.
    Uncaptured(EntityId),
    Pool(PoolError),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(id) => write!(f, "entity {} not found", id),
            Self::NotDeletable(id) => write!(f, "entity {} cannot be deleted directly", id),
            Self::WrongKind { id, expected } => {
                write!(f, "entity {} is not a {}", id, expected.as_str())
            }
            Self::Uncaptured(id) => write!(f, "delete of {} replayed before first apply", id),
            Self::Pool(e) => write!(f, "pool error: {}", e),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<PoolError> for ActionError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

impl Action {
    /// Apply this action to `pool`.
    ///
    /// `first` is true on the initial application and false on a redo. When
    /// `first` is set, a delete captures what it removes and an edit records
    /// the value it replaced as `before`; a redo reuses those captures.
    pub fn forward(&mut self, pool: &mut Pool, first: bool) -> Result<(), ActionError> {
        match self {
            Action::None => Ok(()),
            Action::Composite { actions } => forward_all(actions, pool, first),
            Action::Delete { id, removed } => delete::forward(*id, removed, pool, first),
            Action::CreateCustomNode { .. }
            | Action::CreateGroupNode { .. }
            | Action::CreatePortalNode { .. }
            | Action::CreateConnection { .. } => create::forward(self, pool),
            Action::MoveGridItem { id, before, after } => {
                let previous = edit::move_to(*id, *after, pool)?;
                if first {
                    *before = previous;
                }
                Ok(())
            }
            Action::SizeGridItem { id, before, after } => {
                let previous = edit::resize_to(*id, *after, pool)?;
                if first {
                    *before = previous;
                }
                Ok(())
            }
            Action::RenameNode { id, before, after } => {
                let previous = edit::rename_to(*id, after, pool)?;
                if first {
                    *before = previous;
                }
                Ok(())
            }
        }
    }

    /// Revert this action. Must follow a successful `forward`.
    pub fn backward(&mut self, pool: &mut Pool) -> Result<(), ActionError> {
        match self {
            Action::None => Ok(()),
            Action::Composite { actions } => backward_all(actions, pool),
            Action::Delete { id, removed } => delete::backward(*id, removed, pool),
            Action::CreateCustomNode { .. }
            | Action::CreateGroupNode { .. }
            | Action::CreatePortalNode { .. }
            | Action::CreateConnection { .. } => create::backward(self, pool),
            Action::MoveGridItem { id, before, .. } => edit::move_to(*id, *before, pool).map(drop),
            Action::SizeGridItem { id, before, .. } => {
                edit::resize_to(*id, *before, pool).map(drop)
            }
            Action::RenameNode { id, before, .. } => edit::rename_to(*id, before, pool).map(drop),
        }
    }
}

/// Sub-actions in order; on failure the applied prefix is reverted.
fn forward_all(actions: &mut [Action], pool: &mut Pool, first: bool) -> Result<(), ActionError> {
    for i in 0..actions.len() {
        if let Err(e) = actions[i].forward(pool, first) {
            for done in actions[..i].iter_mut().rev() {
                if let Err(undo_err) = done.backward(pool) {
                    log::error!(target: "history", "composite rollback failed: {}", undo_err);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Sub-actions in reverse; on failure the reverted suffix is re-applied.
fn backward_all(actions: &mut [Action], pool: &mut Pool) -> Result<(), ActionError> {
    let len = actions.len();
    for i in (0..len).rev() {
        if let Err(e) = actions[i].backward(pool) {
            for done in actions[i + 1..].iter_mut() {
                if let Err(redo_err) = done.forward(pool, false) {
                    log::error!(target: "history", "composite rollback failed: {}", redo_err);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

fn require(pool: &Pool, id: EntityId, expected: EntityType) -> Result<(), ActionError> {
    match pool.get(id) {
        None => Err(ActionError::Missing(id)),
        Some(e) if e.entity_type() != expected => Err(ActionError::WrongKind { id, expected }),
        Some(_) => Ok(()),
    }
}

/// `id`, its descendants, and every connection touching a control among
/// them, in pool order.
fn removal_set(pool: &Pool, id: EntityId) -> Vec<EntityId> {
    let subtree = pool.descendants(id);
    let controls: Vec<EntityId> = subtree
        .iter()
        .copied()
        .filter(|c| {
            pool.get(*c)
                .map(|e| e.entity_type() == EntityType::Control)
                .unwrap_or(false)
        })
        .collect();
    let mut ids = subtree;
    for conn in pool.connections_touching(&controls) {
        if !ids.contains(&conn) {
            ids.push(conn);
        }
    }
    ids.sort_by_key(|i| pool.index_of(*i));
    ids
}
