//! Live child queries over a pool.
//!
//! A [`ChildrenWatch`] keeps the ids of every entity matching a filter and a
//! parent, in pool order. The pool holds a weak reference to each watch and
//! updates it synchronously inside `register`, `restore` and `destroy`.
//! Dropping the handle unsubscribes.

use std::cell::RefCell;
use std::rc::Rc;

use super::EntityFilter;
use crate::entity::Entity;
use crate::EntityId;

type Listener = Box<dyn FnMut(&Entity)>;

pub(super) struct WatchShared {
    pub(super) filter: EntityFilter,
    pub(super) parent: Option<EntityId>,
    ids: RefCell<Vec<EntityId>>,
    on_insert: RefCell<Vec<Listener>>,
    on_remove: RefCell<Vec<Listener>>,
}

impl WatchShared {
    pub(super) fn new(filter: EntityFilter, parent: Option<EntityId>, ids: Vec<EntityId>) -> Self {
        Self {
            filter,
            parent,
            ids: RefCell::new(ids),
            on_insert: RefCell::new(Vec::new()),
            on_remove: RefCell::new(Vec::new()),
        }
    }

    pub(super) fn matches(&self, entity: &Entity) -> bool {
        entity.parent == self.parent && self.filter.matches(entity)
    }

    /// `position` is the index among matching entities, not the pool index.
    pub(super) fn inserted(&self, position: usize, entity: &Entity) {
        {
            let mut ids = self.ids.borrow_mut();
            let position = position.min(ids.len());
            ids.insert(position, entity.id);
        }
        fire(&self.on_insert, entity);
    }

    pub(super) fn removed(&self, entity: &Entity) {
        self.ids.borrow_mut().retain(|id| *id != entity.id);
        fire(&self.on_remove, entity);
    }
}

/// Listeners are taken out while they run so one may register another.
fn fire(slot: &RefCell<Vec<Listener>>, entity: &Entity) {
    let mut listeners = std::mem::take(&mut *slot.borrow_mut());
    for listener in listeners.iter_mut() {
        listener(entity);
    }
    let mut current = slot.borrow_mut();
    let added = std::mem::replace(&mut *current, listeners);
    current.extend(added);
}

/// Handle to a live child query. See [`Pool::find_children_watch`](super::Pool::find_children_watch).
pub struct ChildrenWatch {
    pub(super) shared: Rc<WatchShared>,
}

impl ChildrenWatch {
    /// Snapshot of the matching ids, in pool order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.shared.ids.borrow().clone()
    }

    pub fn first(&self) -> Option<EntityId> {
        self.shared.ids.borrow().first().copied()
    }

    pub fn len(&self) -> usize {
        self.shared.ids.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.ids.borrow().is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.shared.ids.borrow().contains(&id)
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.shared.parent
    }

    /// Called after a matching entity enters the pool.
    ///
    /// Listeners get the entity, never the pool: mutating the pool from inside
    /// a notification is not possible.
    pub fn on_insert(&self, listener: impl FnMut(&Entity) + 'static) {
        self.shared.on_insert.borrow_mut().push(Box::new(listener));
    }

    /// Called after a matching entity leaves the pool.
    pub fn on_remove(&self, listener: impl FnMut(&Entity) + 'static) {
        self.shared.on_remove.borrow_mut().push(Box::new(listener));
    }
}

impl std::fmt::Debug for ChildrenWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildrenWatch")
            .field("filter", &self.shared.filter)
            .field("parent", &self.shared.parent)
            .field("ids", &*self.shared.ids.borrow())
            .finish()
    }
}
