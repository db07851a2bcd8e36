use super::{removal_set, require, ActionError};
use crate::action::Action;
use crate::entity::{
    Connection, Control, ControlKind, Entity, EntityKind, EntityType, Node, NodeKind, Surface,
};
use crate::geometry::{GridPos, GridSize};
use crate::pool::{Pool, PoolError};

/// Entities a create action registers, parents first.
fn entities_for(action: &Action) -> Vec<Entity> {
    match action {
        Action::CreateCustomNode {
            id,
            surface,
            pos,
            size,
            name,
            code,
        } => vec![Entity::new(
            *id,
            Some(*surface),
            EntityKind::Node(Node::new(
                NodeKind::Custom { code: code.clone() },
                name.clone(),
                *pos,
                *size,
            )),
        )],
        Action::CreateGroupNode {
            id,
            inner_surface,
            surface,
            pos,
            size,
            name,
        } => vec![
            Entity::new(
                *id,
                Some(*surface),
                EntityKind::Node(Node::new(NodeKind::Group, name.clone(), *pos, *size)),
            ),
            Entity::new(
                *inner_surface,
                Some(*id),
                EntityKind::Surface(Surface::group()),
            ),
        ],
        Action::CreatePortalNode {
            id,
            control,
            surface,
            pos,
            size,
            name,
            portal,
            value,
        } => vec![
            Entity::new(
                *id,
                Some(*surface),
                EntityKind::Node(Node::new(
                    NodeKind::Portal {
                        portal: *portal,
                        value: *value,
                    },
                    name.clone(),
                    *pos,
                    *size,
                )),
            ),
            Entity::new(
                *control,
                Some(*id),
                EntityKind::Control(Control::new(
                    ControlKind::for_value(*value),
                    name.clone(),
                    GridPos::ORIGIN,
                    GridSize::default(),
                )),
            ),
        ],
        Action::CreateConnection {
            id,
            surface,
            control_a,
            control_b,
        } => vec![Entity::new(
            *id,
            Some(*surface),
            EntityKind::Connection(Connection::new(*control_a, *control_b)),
        )],
        _ => Vec::new(),
    }
}

pub(super) fn forward(action: &Action, pool: &mut Pool) -> Result<(), ActionError> {
    match action {
        Action::CreateCustomNode { surface, .. }
        | Action::CreateGroupNode { surface, .. }
        | Action::CreatePortalNode { surface, .. } => {
            require(pool, *surface, EntityType::Surface)?;
        }
        Action::CreateConnection {
            surface,
            control_a,
            control_b,
            ..
        } => {
            require(pool, *surface, EntityType::Surface)?;
            require(pool, *control_a, EntityType::Control)?;
            require(pool, *control_b, EntityType::Control)?;
        }
        _ => {}
    }

    let entities = entities_for(action);
    if let Some(taken) = entities.iter().find(|e| pool.contains(e.id)) {
        return Err(PoolError::DuplicateId(taken.id).into());
    }
    for entity in entities {
        pool.register(entity)?;
    }
    Ok(())
}

/// Removes the created entities together with anything attached to them
/// since (controls added by the runtime, connections to those controls).
pub(super) fn backward(action: &Action, pool: &mut Pool) -> Result<(), ActionError> {
    let Some(id) = action.created_id() else {
        return Ok(());
    };
    if !pool.contains(id) {
        return Err(ActionError::Missing(id));
    }
    let ids = removal_set(pool, id);
    let created = entities_for(action).len();
    if ids.len() > created {
        log::debug!(
            target: "history",
            "undo of {} also removes {} dependent entities",
            action.action_type(),
            ids.len() - created
        );
    }
    for id in ids.into_iter().rev() {
        pool.destroy(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::action::Action;
    use crate::entity::{ControlKind, Entity, PortalKind, SurfaceKind, ValueType};
    use crate::geometry::GridPos;
    use crate::pool::{EntityFilter, Pool, PoolError};
    use crate::reduce::ActionError;
    use crate::EntityId;

    fn pool_with_root() -> (Pool, EntityId) {
        let mut pool = Pool::new();
        let root = EntityId::generate();
        pool.register(Entity::root_surface(root)).unwrap();
        (pool, root)
    }

    fn portal(pool: &mut Pool, root: EntityId, name: &str) -> (EntityId, EntityId) {
        let mut a = Action::create_portal_node(
            root,
            GridPos::ORIGIN,
            name,
            PortalKind::Output,
            ValueType::Midi,
        );
        a.forward(pool, true).unwrap();
        match a {
            Action::CreatePortalNode { id, control, .. } => (id, control),
            _ => unreachable!(),
        }
    }

    #[test]
    fn group_node_creates_inner_surface() {
        let (mut pool, root) = pool_with_root();
        let mut a = Action::create_group_node(root, GridPos::new(2, 2), "group");
        a.forward(&mut pool, true).unwrap();
        let gid = a.created_id().unwrap();

        let inner: Vec<_> = pool.find_children(EntityFilter::SURFACES, Some(gid)).collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].as_surface().unwrap().kind, SurfaceKind::Group);

        a.backward(&mut pool).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn portal_node_creates_matching_control() {
        let (mut pool, root) = pool_with_root();
        let (node, control) = portal(&mut pool, root, "out");
        let ctl = pool.get(control).unwrap();
        assert_eq!(ctl.parent, Some(node));
        assert_eq!(ctl.as_control().unwrap().kind, ControlKind::Midi);
    }

    #[test]
    fn create_on_missing_surface_fails_without_mutation() {
        let (mut pool, _) = pool_with_root();
        let before = pool.clone();
        let ghost = EntityId::generate();
        let mut a = Action::create_custom_node(ghost, GridPos::ORIGIN, "n", "");
        assert_eq!(a.forward(&mut pool, true), Err(ActionError::Missing(ghost)));
        assert_eq!(pool, before);
    }

    #[test]
    fn replaying_a_create_twice_reports_duplicate() {
        let (mut pool, root) = pool_with_root();
        let mut a = Action::create_custom_node(root, GridPos::ORIGIN, "n", "");
        a.forward(&mut pool, true).unwrap();
        let id = a.created_id().unwrap();
        assert_eq!(
            a.forward(&mut pool, false),
            Err(ActionError::Pool(PoolError::DuplicateId(id)))
        );
    }

    #[test]
    fn connection_requires_control_endpoints() {
        let (mut pool, root) = pool_with_root();
        let (node_a, control_a) = portal(&mut pool, root, "a");
        let mut bad = Action::create_connection(root, control_a, node_a);
        assert!(matches!(
            bad.forward(&mut pool, true),
            Err(ActionError::WrongKind { .. })
        ));

        let (_, control_b) = portal(&mut pool, root, "b");
        let mut good = Action::create_connection(root, control_a, control_b);
        good.forward(&mut pool, true).unwrap();
        assert!(pool.validate().is_ok());
        good.backward(&mut pool).unwrap();
        assert!(!pool.contains(good.created_id().unwrap()));
    }

    #[test]
    fn undoing_a_node_removes_connections_attached_later() {
        let (mut pool, root) = pool_with_root();
        let mut create = Action::create_portal_node(
            root,
            GridPos::ORIGIN,
            "a",
            PortalKind::Input,
            ValueType::Num,
        );
        create.forward(&mut pool, true).unwrap();
        let control_a = match &create {
            Action::CreatePortalNode { control, .. } => *control,
            _ => unreachable!(),
        };
        let (_, control_b) = portal(&mut pool, root, "b");
        let mut conn = Action::create_connection(root, control_a, control_b);
        conn.forward(&mut pool, true).unwrap();

        create.backward(&mut pool).unwrap();
        assert!(!pool.contains(conn.created_id().unwrap()));
        assert!(pool.validate().is_ok());
    }
}
