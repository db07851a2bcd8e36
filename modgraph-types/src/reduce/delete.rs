use super::{removal_set, ActionError};
use crate::action::RemovedEntity;
use crate::entity::EntityType;
use crate::pool::{Pool, PoolError};
use crate::EntityId;

pub(super) fn forward(
    id: EntityId,
    removed: &mut Vec<RemovedEntity>,
    pool: &mut Pool,
    first: bool,
) -> Result<(), ActionError> {
    let Some(target) = pool.get(id) else {
        return Err(ActionError::Missing(id));
    };
    if target.entity_type() == EntityType::Surface {
        return Err(ActionError::NotDeletable(id));
    }

    if first {
        let ids = removal_set(pool, id);
        let mut captured = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev() {
            if let Some(index) = pool.index_of(id) {
                if let Some(entity) = pool.destroy(id) {
                    captured.push(RemovedEntity { index, entity });
                }
            }
        }
        captured.reverse();
        log::debug!(target: "history", "delete {} removed {} entities", id, captured.len());
        *removed = captured;
        return Ok(());
    }

    if removed.is_empty() {
        return Err(ActionError::Uncaptured(id));
    }
    if let Some(gone) = removed.iter().find(|r| !pool.contains(r.entity.id)) {
        return Err(ActionError::Missing(gone.entity.id));
    }
    for r in removed.iter().rev() {
        pool.destroy(r.entity.id);
    }
    Ok(())
}

/// Restores captured entities lowest index first, so each lands back at
/// the position it had.
pub(super) fn backward(
    id: EntityId,
    removed: &mut Vec<RemovedEntity>,
    pool: &mut Pool,
) -> Result<(), ActionError> {
    if removed.is_empty() {
        return Err(ActionError::Uncaptured(id));
    }
    if let Some(taken) = removed.iter().find(|r| pool.contains(r.entity.id)) {
        return Err(PoolError::DuplicateId(taken.entity.id).into());
    }
    for r in removed.iter() {
        pool.restore(r.index, r.entity.clone())?;
    }
    Ok(())
}
