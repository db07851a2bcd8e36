//! # modgraph-types
//!
//! Shared type definitions for the modgraph editor core.
//! This crate holds the document object graph (entities and the pool that owns
//! them), the undoable `Action` enum, and the pure reducers that apply and
//! revert actions against a pool. It has no I/O and no notion of files.
//!
//! `modgraph-core` builds model roots, undo history and persistence on top of it.

pub mod action;
pub mod entity;
pub mod event;
pub mod geometry;
pub mod pool;
pub mod reduce;

pub use action::{Action, ActionType, RemovedEntity};
pub use entity::{
    Connection, Control, ControlKind, Entity, EntityKind, EntityType, GridItem, Node, NodeKind,
    PortalKind, Surface, SurfaceKind, ValueType,
};
pub use event::{LibraryEntryEvent, LibraryEvent, ProjectEvent};
pub use geometry::{GridPos, GridRect, GridSize};
pub use pool::{ChildrenWatch, EntityFilter, Pool, PoolError};
pub use reduce::ActionError;

use uuid::Uuid;

/// Unique identifier for an entity in a pool.
///
/// Ids are stable across undo/redo and across save/load. The nil UUID is
/// reserved: it never names an entity and encodes "no parent" on disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Allocate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(self) -> Uuid {
        self.0
    }

    pub fn is_nil(self) -> bool {
        self.0.is_nil()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_not_nil() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn nil_round_trips_through_uuid() {
        let nil = EntityId::from_uuid(Uuid::nil());
        assert!(nil.is_nil());
        assert_eq!(nil.uuid(), Uuid::nil());
    }
}
