//! The pool: owning, insertion-ordered store of every entity in one document.
//!
//! Entities are addressed by [`EntityId`]; cross-entity links are ids resolved
//! through [`Pool::get`], which returns `None` for anything destroyed. The pool
//! never cascades: cleaning up dependents is the job of the action that
//! destroys something (see `reduce::delete`).

mod watch;

pub use watch::ChildrenWatch;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::entity::{Entity, EntityType, SurfaceKind};
use crate::EntityId;
use watch::WatchShared;

/// Which entities a child query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFilter {
    Any,
    Only(EntityType),
}

impl EntityFilter {
    pub const SURFACES: EntityFilter = EntityFilter::Only(EntityType::Surface);
    pub const NODES: EntityFilter = EntityFilter::Only(EntityType::Node);
    pub const CONTROLS: EntityFilter = EntityFilter::Only(EntityType::Control);
    pub const CONNECTIONS: EntityFilter = EntityFilter::Only(EntityType::Connection);

    pub fn matches(self, entity: &Entity) -> bool {
        match self {
            EntityFilter::Any => true,
            EntityFilter::Only(ty) => entity.entity_type() == ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    DuplicateId(EntityId),
    NilId,
    DanglingParent { id: EntityId, parent: EntityId },
    BadConnection { id: EntityId, endpoint: EntityId },
    /// A root surface with a parent, or a group surface without one.
    MisplacedSurface(EntityId),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "entity {} is already registered", id),
            Self::NilId => write!(f, "the nil id cannot name an entity"),
            Self::DanglingParent { id, parent } => {
                write!(f, "entity {} refers to missing parent {}", id, parent)
            }
            Self::BadConnection { id, endpoint } => {
                write!(f, "connection {} refers to {}, which is not a control", id, endpoint)
            }
            Self::MisplacedSurface(id) => {
                write!(f, "surface {} has a parent that does not match its kind", id)
            }
        }
    }
}

impl std::error::Error for PoolError {}

#[derive(Default)]
pub struct Pool {
    entities: IndexMap<EntityId, Entity>,
    watches: RefCell<Vec<Weak<WatchShared>>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a new entity, appending it in iteration order.
    pub fn register(&mut self, entity: Entity) -> Result<(), PoolError> {
        self.check_insertable(&entity)?;
        let id = entity.id;
        let (index, _) = self.entities.insert_full(id, entity);
        log::trace!(target: "pool", "registered {} at {}", id, index);
        self.notify_inserted(index);
        Ok(())
    }

    /// Re-insert an entity at a specific iteration position.
    ///
    /// Used to undo a destroy so that iteration (and therefore serialization)
    /// order comes back exactly. `index` past the end appends.
    pub fn restore(&mut self, index: usize, entity: Entity) -> Result<(), PoolError> {
        self.check_insertable(&entity)?;
        let index = index.min(self.entities.len());
        let id = entity.id;
        self.entities.shift_insert(index, id, entity);
        log::trace!(target: "pool", "restored {} at {}", id, index);
        self.notify_inserted(index);
        Ok(())
    }

    /// Remove an entity and hand back ownership. Does not touch dependents.
    pub fn destroy(&mut self, id: EntityId) -> Option<Entity> {
        let (index, _, entity) = self.entities.shift_remove_full(&id)?;
        log::trace!(target: "pool", "destroyed {} from {}", id, index);
        for watch in self.live_watches() {
            if watch.matches(&entity) {
                watch.removed(&entity);
            }
        }
        Some(entity)
    }

    /// Destroy everything, last-registered first. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let ids: Vec<EntityId> = self.entities.keys().rev().copied().collect();
        for id in &ids {
            self.destroy(*id);
        }
        ids.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// In-place edits keep `parent` and the variant; watches are not told.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iteration position of an entity.
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.get_index_of(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Every entity of the filtered kind whose parent is `parent`
    /// (`None` selects parentless entities). Lazy; nothing is copied.
    pub fn find_children(
        &self,
        filter: EntityFilter,
        parent: Option<EntityId>,
    ) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .values()
            .filter(move |e| e.parent == parent && filter.matches(e))
    }

    /// Like [`find_children`](Self::find_children), but the returned handle
    /// stays current as entities are registered and destroyed.
    pub fn find_children_watch(
        &self,
        filter: EntityFilter,
        parent: Option<EntityId>,
    ) -> ChildrenWatch {
        let ids = self.find_children(filter, parent).map(|e| e.id).collect();
        let shared = Rc::new(WatchShared::new(filter, parent, ids));
        self.watches.borrow_mut().push(Rc::downgrade(&shared));
        ChildrenWatch { shared }
    }

    /// `id` followed by everything transitively parented to it, in pool order.
    /// Empty when `id` is not in the pool.
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut set = HashSet::from([id]);
        loop {
            let before = set.len();
            for entity in self.entities.values() {
                if let Some(parent) = entity.parent {
                    if set.contains(&parent) {
                        set.insert(entity.id);
                    }
                }
            }
            if set.len() == before {
                break;
            }
        }
        self.entities
            .keys()
            .filter(|k| set.contains(k))
            .copied()
            .collect()
    }

    /// Connections with at least one endpoint in `ids`, in pool order.
    pub fn connections_touching(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| {
                e.as_connection()
                    .map(|c| ids.iter().any(|id| c.touches(*id)))
                    .unwrap_or(false)
            })
            .map(|e| e.id)
            .collect()
    }

    /// Check referential integrity of the finished graph.
    pub fn validate(&self) -> Result<(), PoolError> {
        for entity in self.entities.values() {
            if let Some(surface) = entity.as_surface() {
                let wants_parent = surface.kind == SurfaceKind::Group;
                if wants_parent != entity.parent.is_some() {
                    return Err(PoolError::MisplacedSurface(entity.id));
                }
            }
            if let Some(parent) = entity.parent {
                if !self.contains(parent) {
                    return Err(PoolError::DanglingParent {
                        id: entity.id,
                        parent,
                    });
                }
            }
            if let Some(conn) = entity.as_connection() {
                for endpoint in [conn.control_a, conn.control_b] {
                    let is_control = self
                        .get(endpoint)
                        .map(|e| e.entity_type() == EntityType::Control)
                        .unwrap_or(false);
                    if !is_control {
                        return Err(PoolError::BadConnection {
                            id: entity.id,
                            endpoint,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_insertable(&self, entity: &Entity) -> Result<(), PoolError> {
        if entity.id.is_nil() {
            return Err(PoolError::NilId);
        }
        if self.entities.contains_key(&entity.id) {
            return Err(PoolError::DuplicateId(entity.id));
        }
        Ok(())
    }

    fn live_watches(&self) -> Vec<Rc<WatchShared>> {
        let mut watches = self.watches.borrow_mut();
        watches.retain(|w| w.strong_count() > 0);
        watches.iter().filter_map(Weak::upgrade).collect()
    }

    fn notify_inserted(&self, index: usize) {
        let Some((_, entity)) = self.entities.get_index(index) else {
            return;
        };
        for watch in self.live_watches() {
            if watch.matches(entity) {
                let position = self
                    .entities
                    .values()
                    .take(index)
                    .filter(|e| watch.matches(e))
                    .count();
                watch.inserted(position, entity);
            }
        }
    }
}

/// Clones the entities only; watches stay attached to the original.
impl Clone for Pool {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            watches: RefCell::new(Vec::new()),
        }
    }
}

/// Order-sensitive: two pools are equal when they iterate the same entities
/// in the same order.
impl PartialEq for Pool {
    fn eq(&self, other: &Self) -> bool {
        self.entities.len() == other.entities.len()
            && self.entities.values().eq(other.entities.values())
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entities.values()).finish()
    }
}
