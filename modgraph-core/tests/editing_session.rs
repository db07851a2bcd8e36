//! End-to-end editing sessions through the public API.

use modgraph_core::persistence::{load_project_file, save_project_file};
use modgraph_core::{ModelError, ModelRoot, PersistOptions, Project};
use modgraph_types::{
    Action, EntityFilter, GridPos, GridRect, GridSize, Pool, PortalKind, ValueType,
};

fn node_pos(root: &ModelRoot, id: modgraph_types::EntityId) -> GridPos {
    root.pool().get(id).unwrap().as_node().unwrap().grid.pos
}

#[test]
fn move_undo_redo() {
    let mut root = ModelRoot::new();
    let surface = root.root_surface();
    let create = Action::create_custom_node(surface, GridPos::new(0, 0), "osc", "");
    let id = create.created_id().unwrap();
    root.apply(create).unwrap();

    root.apply(Action::move_grid_item(id, GridPos::new(0, 0), GridPos::new(10, 5)))
        .unwrap();
    assert_eq!(node_pos(&root, id), GridPos::new(10, 5));

    assert!(root.undo().unwrap());
    assert_eq!(node_pos(&root, id), GridPos::new(0, 0));

    assert!(root.redo().unwrap());
    assert_eq!(node_pos(&root, id), GridPos::new(10, 5));
}

/// Builds a patch with every action kind, returning the actions in order.
fn every_action(root: &ModelRoot) -> Vec<Action> {
    let surface = root.root_surface();
    let group = Action::create_group_node(surface, GridPos::new(1, 1), "group");
    let (group_id, inner) = match &group {
        Action::CreateGroupNode {
            id, inner_surface, ..
        } => (*id, *inner_surface),
        _ => unreachable!(),
    };
    let inside = Action::create_portal_node(
        inner,
        GridPos::new(0, 0),
        "out",
        PortalKind::Output,
        ValueType::Midi,
    );
    let outside = Action::create_portal_node(
        surface,
        GridPos::new(4, 0),
        "in",
        PortalKind::Input,
        ValueType::Midi,
    );
    let (inside_control, outside_id, outside_control) = match (&inside, &outside) {
        (
            Action::CreatePortalNode { control: a, .. },
            Action::CreatePortalNode {
                id: b, control: c, ..
            },
        ) => (*a, *b, *c),
        _ => unreachable!(),
    };
    let custom = Action::create_custom_node(surface, GridPos::new(8, 8), "lfo", "out = sin(t)");
    let custom_id = custom.created_id().unwrap();

    vec![
        group,
        inside,
        outside,
        Action::create_connection(surface, inside_control, outside_control),
        Action::composite(vec![
            custom,
            Action::rename_node(custom_id, "lfo", "slow lfo"),
            Action::size_grid_item(
                custom_id,
                GridRect::new(GridPos::new(8, 8), GridSize::default()),
                GridRect::new(GridPos::new(7, 8), GridSize::new(3, 2)),
            ),
        ]),
        Action::move_grid_item(outside_id, GridPos::new(4, 0), GridPos::new(5, 2)),
        Action::delete(group_id),
        Action::None,
    ]
}

#[test]
fn n_undos_then_n_redos_reproduce_state() {
    let mut root = ModelRoot::new();
    let initial = root.pool().clone();
    let actions = every_action(&root);
    let n = actions.len();
    for action in actions {
        root.apply(action).unwrap();
    }
    let applied = root.pool().clone();
    assert!(applied.validate().is_ok());

    for _ in 0..n {
        assert!(root.undo().unwrap());
    }
    assert_eq!(root.pool(), &initial);
    assert!(!root.undo().unwrap());

    for _ in 0..n {
        assert!(root.redo().unwrap());
    }
    assert_eq!(root.pool(), &applied);
    assert!(!root.redo().unwrap());
}

#[test]
fn watch_follows_undo_and_redo() {
    let mut root = ModelRoot::new();
    let surface = root.root_surface();
    let watch = root
        .pool()
        .find_children_watch(EntityFilter::NODES, Some(surface));
    for action in every_action(&root) {
        root.apply(action).unwrap();
    }
    let after = watch.ids();
    assert_eq!(after.len(), 2);

    while root.undo().unwrap() {}
    assert!(watch.is_empty());
    while root.redo().unwrap() {}
    assert_eq!(watch.ids(), after);
}

#[test]
fn saved_session_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.axp");
    let mut project = Project::new();
    for action in every_action(project.root()) {
        project.apply(action).unwrap();
    }
    project.undo().unwrap();
    project.undo().unwrap();

    let options = PersistOptions::default();
    save_project_file(&path, &project, &options).unwrap();
    let mut loaded = load_project_file(&path, &options).unwrap();
    assert_eq!(loaded.root().pool(), project.root().pool());

    while project.redo().unwrap() {}
    while loaded.redo().unwrap() {}
    assert_eq!(loaded.root().pool(), project.root().pool());
}

#[test]
fn rootless_model_is_rejected() {
    assert_eq!(
        ModelRoot::from_pool(Pool::new()).unwrap_err(),
        ModelError::RootSurfaceCount(0)
    );
}
