//! Entities: the structural units stored in a [`Pool`](crate::Pool).
//!
//! An entity is an id, an optional parent id and a closed set of variants.
//! Relationships between entities are always ids resolved through the pool;
//! no entity owns another.

use serde::{Deserialize, Serialize};

use crate::geometry::{GridPos, GridRect, GridSize};
use crate::EntityId;

/// Discriminant of [`EntityKind`], used for typed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Surface,
    Node,
    Control,
    Connection,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Surface => "surface",
            EntityType::Node => "node",
            EntityType::Control => "control",
            EntityType::Connection => "connection",
        }
    }
}

// ============================================================================
// Surfaces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Top-level surface of a model root. Has no parent.
    Root,
    /// Inner surface of a group node. Its parent is the group node.
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub pan: (f32, f32),
    pub zoom: f32,
}

impl Surface {
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            pan: (0.0, 0.0),
            zoom: 1.0,
        }
    }

    pub fn root() -> Self {
        Self::new(SurfaceKind::Root)
    }

    pub fn group() -> Self {
        Self::new(SurfaceKind::Group)
    }
}

// ============================================================================
// Grid items (nodes and controls)
// ============================================================================

/// Placement shared by everything that lives on a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridItem {
    pub pos: GridPos,
    pub size: GridSize,
    pub selected: bool,
}

impl GridItem {
    pub fn new(pos: GridPos, size: GridSize) -> Self {
        Self {
            pos,
            size,
            selected: false,
        }
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(self.pos, self.size)
    }

    pub fn set_rect(&mut self, rect: GridRect) {
        self.pos = rect.pos;
        self.size = rect.size;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortalKind {
    Input,
    Output,
    Automation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Num,
    Midi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Node backed by user code, compiled by the runtime.
    Custom { code: String },
    /// Node that contains its own surface.
    Group,
    /// Node exposing one value across the surface boundary.
    Portal { portal: PortalKind, value: ValueType },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
    pub grid: GridItem,
}

impl Node {
    pub fn new(kind: NodeKind, name: impl Into<String>, pos: GridPos, size: GridSize) -> Self {
        Self {
            kind,
            name: name.into(),
            grid: GridItem::new(pos, size),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    Num,
    Midi,
    NumExtract,
    MidiExtract,
}

impl ControlKind {
    /// Control created for a portal node carrying `value`.
    pub fn for_value(value: ValueType) -> Self {
        match value {
            ValueType::Num => ControlKind::Num,
            ValueType::Midi => ControlKind::Midi,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            ControlKind::Num | ControlKind::NumExtract => ValueType::Num,
            ControlKind::Midi | ControlKind::MidiExtract => ValueType::Midi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub kind: ControlKind,
    pub name: String,
    pub grid: GridItem,
}

impl Control {
    pub fn new(kind: ControlKind, name: impl Into<String>, pos: GridPos, size: GridSize) -> Self {
        Self {
            kind,
            name: name.into(),
            grid: GridItem::new(pos, size),
        }
    }
}

// ============================================================================
// Connections
// ============================================================================

/// Wire between two controls. Its parent is the surface that displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub control_a: EntityId,
    pub control_b: EntityId,
}

impl Connection {
    pub fn new(control_a: EntityId, control_b: EntityId) -> Self {
        Self {
            control_a,
            control_b,
        }
    }

    pub fn touches(&self, id: EntityId) -> bool {
        self.control_a == id || self.control_b == id
    }
}

// ============================================================================
// Entity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Surface(Surface),
    Node(Node),
    Control(Control),
    Connection(Connection),
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Surface(_) => EntityType::Surface,
            EntityKind::Node(_) => EntityType::Node,
            EntityKind::Control(_) => EntityType::Control,
            EntityKind::Connection(_) => EntityType::Connection,
        }
    }

    /// Grid placement, for variants that sit on a grid.
    pub fn grid(&self) -> Option<&GridItem> {
        match self {
            EntityKind::Node(n) => Some(&n.grid),
            EntityKind::Control(c) => Some(&c.grid),
            _ => None,
        }
    }

    pub fn grid_mut(&mut self) -> Option<&mut GridItem> {
        match self {
            EntityKind::Node(n) => Some(&mut n.grid),
            EntityKind::Control(c) => Some(&mut c.grid),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            EntityKind::Node(n) => Some(&n.name),
            EntityKind::Control(c) => Some(&c.name),
            _ => None,
        }
    }

    /// Returns false for variants without a name.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        match self {
            EntityKind::Node(n) => n.name = name.into(),
            EntityKind::Control(c) => c.name = name.into(),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(id: EntityId, parent: Option<EntityId>, kind: EntityKind) -> Self {
        Self { id, parent, kind }
    }

    pub fn root_surface(id: EntityId) -> Self {
        Self::new(id, None, EntityKind::Surface(Surface::root()))
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn is_root_surface(&self) -> bool {
        self.parent.is_none()
            && matches!(&self.kind, EntityKind::Surface(s) if s.kind == SurfaceKind::Root)
    }

    pub fn as_surface(&self) -> Option<&Surface> {
        match &self.kind {
            EntityKind::Surface(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match &self.kind {
            EntityKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match &mut self.kind {
            EntityKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&Control> {
        match &self.kind {
            EntityKind::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_connection(&self) -> Option<&Connection> {
        match &self.kind {
            EntityKind::Connection(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_surface_has_no_parent() {
        let e = Entity::root_surface(EntityId::generate());
        assert!(e.is_root_surface());
        assert_eq!(e.entity_type(), EntityType::Surface);
    }

    #[test]
    fn group_surface_is_not_root() {
        let e = Entity::new(
            EntityId::generate(),
            Some(EntityId::generate()),
            EntityKind::Surface(Surface::group()),
        );
        assert!(!e.is_root_surface());
    }

    #[test]
    fn grid_capability_only_on_nodes_and_controls() {
        let mut node = EntityKind::Node(Node::new(
            NodeKind::Group,
            "g",
            GridPos::new(1, 2),
            GridSize::default(),
        ));
        assert_eq!(node.grid().map(|g| g.pos), Some(GridPos::new(1, 2)));
        assert_eq!(node.name(), Some("g"));
        assert!(node.set_name("group"));
        assert_eq!(node.name(), Some("group"));

        let mut surface = EntityKind::Surface(Surface::root());
        assert!(surface.grid().is_none());
        assert!(surface.name().is_none());
        assert!(!surface.set_name("x"));

        let conn = EntityKind::Connection(Connection::new(
            EntityId::generate(),
            EntityId::generate(),
        ));
        assert!(conn.grid().is_none());
    }

    #[test]
    fn portal_control_kind_follows_value_type() {
        assert_eq!(ControlKind::for_value(ValueType::Midi), ControlKind::Midi);
        assert_eq!(ControlKind::NumExtract.value_type(), ValueType::Num);
    }
}
