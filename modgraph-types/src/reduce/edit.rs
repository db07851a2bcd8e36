use super::ActionError;
use crate::entity::{EntityType, GridItem};
use crate::geometry::{GridPos, GridRect};
use crate::pool::Pool;
use crate::EntityId;

fn grid_item(pool: &mut Pool, id: EntityId) -> Result<&mut GridItem, ActionError> {
    let entity = pool.get_mut(id).ok_or(ActionError::Missing(id))?;
    entity.kind.grid_mut().ok_or(ActionError::WrongKind {
        id,
        expected: EntityType::Node,
    })
}

/// Each setter returns the value it replaced.
pub(super) fn move_to(id: EntityId, pos: GridPos, pool: &mut Pool) -> Result<GridPos, ActionError> {
    let grid = grid_item(pool, id)?;
    Ok(std::mem::replace(&mut grid.pos, pos))
}

pub(super) fn resize_to(
    id: EntityId,
    rect: GridRect,
    pool: &mut Pool,
) -> Result<GridRect, ActionError> {
    let grid = grid_item(pool, id)?;
    let previous = grid.rect();
    grid.set_rect(rect);
    Ok(previous)
}

pub(super) fn rename_to(id: EntityId, name: &str, pool: &mut Pool) -> Result<String, ActionError> {
    let entity = pool.get_mut(id).ok_or(ActionError::Missing(id))?;
    let node = entity.as_node_mut().ok_or(ActionError::WrongKind {
        id,
        expected: EntityType::Node,
    })?;
    Ok(std::mem::replace(&mut node.name, name.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::action::Action;
    use crate::entity::Entity;
    use crate::geometry::{GridPos, GridRect, GridSize};
    use crate::pool::{EntityFilter, Pool};
    use crate::reduce::ActionError;
    use crate::EntityId;

    fn pool_with_node() -> (Pool, EntityId, EntityId) {
        let mut pool = Pool::new();
        let root = EntityId::generate();
        pool.register(Entity::root_surface(root)).unwrap();
        let mut create = Action::create_custom_node(root, GridPos::ORIGIN, "osc", "");
        create.forward(&mut pool, true).unwrap();
        (pool, root, create.created_id().unwrap())
    }

    #[test]
    fn move_and_undo() {
        let (mut pool, _, id) = pool_with_node();
        let mut a = Action::move_grid_item(id, GridPos::ORIGIN, GridPos::new(10, 5));
        a.forward(&mut pool, true).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().grid.pos, GridPos::new(10, 5));
        a.backward(&mut pool).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().grid.pos, GridPos::ORIGIN);
    }

    #[test]
    fn resize_from_the_left_moves_and_grows() {
        let (mut pool, _, id) = pool_with_node();
        let before = GridRect::new(GridPos::ORIGIN, GridSize::default());
        let after = GridRect::new(GridPos::new(-2, 0), GridSize::new(3, 1));
        let mut a = Action::size_grid_item(id, before, after);
        a.forward(&mut pool, true).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().grid.rect(), after);
        a.backward(&mut pool).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().grid.rect(), before);
    }

    #[test]
    fn rename_requires_a_node() {
        let (mut pool, root, id) = pool_with_node();
        let mut a = Action::rename_node(id, "osc", "lfo");
        a.forward(&mut pool, true).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().name, "lfo");

        let mut bad = Action::rename_node(root, "", "x");
        assert!(matches!(
            bad.forward(&mut pool, true),
            Err(ActionError::WrongKind { .. })
        ));
    }

    #[test]
    fn undo_restores_the_position_found_not_the_one_claimed() {
        let (mut pool, _, id) = pool_with_node();
        let before = pool.clone();
        let mut a = Action::move_grid_item(id, GridPos::new(3, 3), GridPos::new(10, 5));
        a.forward(&mut pool, true).unwrap();
        assert_eq!(
            a,
            Action::move_grid_item(id, GridPos::ORIGIN, GridPos::new(10, 5))
        );
        a.backward(&mut pool).unwrap();
        assert_eq!(pool, before);
    }

    #[test]
    fn stale_rename_and_resize_undo_exactly() {
        let (mut pool, _, id) = pool_with_node();
        let before = pool.clone();
        let stale = GridRect::new(GridPos::new(7, 7), GridSize::new(9, 9));
        let after = GridRect::new(GridPos::new(1, 1), GridSize::new(2, 2));
        let mut resize = Action::size_grid_item(id, stale, after);
        let mut rename = Action::rename_node(id, "wrong", "lfo");
        resize.forward(&mut pool, true).unwrap();
        rename.forward(&mut pool, true).unwrap();

        rename.backward(&mut pool).unwrap();
        assert_eq!(pool.get(id).unwrap().as_node().unwrap().name, "osc");
        resize.backward(&mut pool).unwrap();
        assert_eq!(pool, before);
    }

    #[test]
    fn redo_keeps_the_captured_value() {
        let (mut pool, _, id) = pool_with_node();
        let mut a = Action::rename_node(id, "wrong", "lfo");
        a.forward(&mut pool, true).unwrap();
        a.backward(&mut pool).unwrap();
        a.forward(&mut pool, false).unwrap();
        assert_eq!(a, Action::rename_node(id, "osc", "lfo"));
    }

    #[test]
    fn edits_leave_child_watches_current() {
        let (mut pool, root, id) = pool_with_node();
        let watch = pool.find_children_watch(EntityFilter::NODES, Some(root));
        let mut rename = Action::rename_node(id, "osc", "lfo");
        let mut resize = Action::size_grid_item(
            id,
            GridRect::default(),
            GridRect::new(GridPos::new(4, 4), GridSize::new(2, 2)),
        );
        rename.forward(&mut pool, true).unwrap();
        resize.forward(&mut pool, true).unwrap();
        assert_eq!(watch.ids(), vec![id]);
        assert_eq!(
            watch.ids(),
            pool.find_children(EntityFilter::NODES, Some(root))
                .map(|e| e.id)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn surfaces_have_no_grid_position() {
        let (mut pool, root, _) = pool_with_node();
        let mut a = Action::move_grid_item(root, GridPos::ORIGIN, GridPos::new(1, 1));
        assert!(matches!(
            a.forward(&mut pool, true),
            Err(ActionError::WrongKind { .. })
        ));
    }
}
