//! Undoable edit commands.
//!
//! Each variant carries exactly what it needs to apply and to revert itself:
//! ids for everything it creates (allocated when the action is built, so a
//! redo reuses them), before/after values for edits (`before` captured from
//! the pool on first application), and the captured subtree for deletes. Application lives in [`crate::reduce`].

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, PortalKind, ValueType};
use crate::geometry::{GridPos, GridRect, GridSize};
use crate::EntityId;

/// Discriminant of [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    None,
    Composite,
    DeleteObject,
    CreateCustomNode,
    CreateGroupNode,
    CreatePortalNode,
    CreateConnection,
    MoveGridItem,
    SizeGridItem,
    RenameNode,
}

impl ActionType {
    /// Label shown in a history list.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::None => "None",
            ActionType::Composite => "Composite",
            ActionType::DeleteObject => "Delete Object",
            ActionType::CreateCustomNode => "Create Custom Node",
            ActionType::CreateGroupNode => "Create Group Node",
            ActionType::CreatePortalNode => "Create Portal Node",
            ActionType::CreateConnection => "Create Connection",
            ActionType::MoveGridItem => "Move Grid Item",
            ActionType::SizeGridItem => "Resize Grid Item",
            ActionType::RenameNode => "Rename Node",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity removed by a delete, with the iteration position it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedEntity {
    pub index: usize,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    None,
    Composite {
        actions: Vec<Action>,
    },
    /// Removes `id`, its descendants and every connection touching a removed
    /// control. `removed` is filled on first application, in pool order.
    Delete {
        id: EntityId,
        removed: Vec<RemovedEntity>,
    },
    CreateCustomNode {
        id: EntityId,
        surface: EntityId,
        pos: GridPos,
        size: GridSize,
        name: String,
        code: String,
    },
    /// Creates the group node and the surface inside it.
    CreateGroupNode {
        id: EntityId,
        inner_surface: EntityId,
        surface: EntityId,
        pos: GridPos,
        size: GridSize,
        name: String,
    },
    /// Creates the portal node and its single control.
    CreatePortalNode {
        id: EntityId,
        control: EntityId,
        surface: EntityId,
        pos: GridPos,
        size: GridSize,
        name: String,
        portal: PortalKind,
        value: ValueType,
    },
    CreateConnection {
        id: EntityId,
        surface: EntityId,
        control_a: EntityId,
        control_b: EntityId,
    },
    /// `before` is overwritten with the entity's actual value on first
    /// application, as are the `before` fields of the two edits below.
    MoveGridItem {
        id: EntityId,
        before: GridPos,
        after: GridPos,
    },
    SizeGridItem {
        id: EntityId,
        before: GridRect,
        after: GridRect,
    },
    RenameNode {
        id: EntityId,
        before: String,
        after: String,
    },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::None => ActionType::None,
            Action::Composite { .. } => ActionType::Composite,
            Action::Delete { .. } => ActionType::DeleteObject,
            Action::CreateCustomNode { .. } => ActionType::CreateCustomNode,
            Action::CreateGroupNode { .. } => ActionType::CreateGroupNode,
            Action::CreatePortalNode { .. } => ActionType::CreatePortalNode,
            Action::CreateConnection { .. } => ActionType::CreateConnection,
            Action::MoveGridItem { .. } => ActionType::MoveGridItem,
            Action::SizeGridItem { .. } => ActionType::SizeGridItem,
            Action::RenameNode { .. } => ActionType::RenameNode,
        }
    }

    pub fn composite(actions: Vec<Action>) -> Self {
        Action::Composite { actions }
    }

    pub fn delete(id: EntityId) -> Self {
        Action::Delete {
            id,
            removed: Vec::new(),
        }
    }

    pub fn create_custom_node(
        surface: EntityId,
        pos: GridPos,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Action::CreateCustomNode {
            id: EntityId::generate(),
            surface,
            pos,
            size: GridSize::default(),
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn create_group_node(surface: EntityId, pos: GridPos, name: impl Into<String>) -> Self {
        Action::CreateGroupNode {
            id: EntityId::generate(),
            inner_surface: EntityId::generate(),
            surface,
            pos,
            size: GridSize::default(),
            name: name.into(),
        }
    }

    pub fn create_portal_node(
        surface: EntityId,
        pos: GridPos,
        name: impl Into<String>,
        portal: PortalKind,
        value: ValueType,
    ) -> Self {
        Action::CreatePortalNode {
            id: EntityId::generate(),
            control: EntityId::generate(),
            surface,
            pos,
            size: GridSize::default(),
            name: name.into(),
            portal,
            value,
        }
    }

    pub fn create_connection(surface: EntityId, control_a: EntityId, control_b: EntityId) -> Self {
        Action::CreateConnection {
            id: EntityId::generate(),
            surface,
            control_a,
            control_b,
        }
    }

    pub fn move_grid_item(id: EntityId, before: GridPos, after: GridPos) -> Self {
        Action::MoveGridItem { id, before, after }
    }

    pub fn size_grid_item(id: EntityId, before: GridRect, after: GridRect) -> Self {
        Action::SizeGridItem { id, before, after }
    }

    pub fn rename_node(id: EntityId, before: impl Into<String>, after: impl Into<String>) -> Self {
        Action::RenameNode {
            id,
            before: before.into(),
            after: after.into(),
        }
    }

    /// Id of the main entity this action creates, if it creates one.
    pub fn created_id(&self) -> Option<EntityId> {
        match self {
            Action::CreateCustomNode { id, .. }
            | Action::CreateGroupNode { id, .. }
            | Action::CreatePortalNode { id, .. }
            | Action::CreateConnection { id, .. } => Some(*id),
            _ => None,
        }
    }
}
