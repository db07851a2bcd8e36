//! One editable document: a pool, its history, and an optional runtime.

use std::fmt;

use modgraph_types::{Action, ActionError, Entity, EntityFilter, EntityId, Pool, PoolError};

use crate::history::History;

/// Opaque runtime or audio backend bound to a document.
///
/// The core never inspects it; it only reports when it becomes bound to a
/// root surface and when it is released.
pub trait ExecutionContext {
    fn attached(&mut self, _root_surface: EntityId) {}
    fn detached(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A document must contain exactly one parentless root surface.
    RootSurfaceCount(usize),
    Pool(PoolError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootSurfaceCount(n) => {
                write!(f, "expected exactly one root surface, found {}", n)
            }
            Self::Pool(e) => write!(f, "invalid entity graph: {}", e),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<PoolError> for ModelError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

pub struct ModelRoot {
    pool: Pool,
    history: History,
    runtime: Option<Box<dyn ExecutionContext>>,
}

impl ModelRoot {
    /// An empty document holding a fresh root surface.
    pub fn new() -> Self {
        Self::with_history(History::default())
    }

    pub fn with_history(history: History) -> Self {
        let mut pool = Pool::new();
        pool.register(Entity::root_surface(EntityId::generate()))
            .expect("fresh pool accepts a fresh id");
        Self {
            pool,
            history,
            runtime: None,
        }
    }

    pub fn from_pool(pool: Pool) -> Result<Self, ModelError> {
        Self::from_parts(pool, History::default())
    }

    /// Adopt an existing graph, checking the root-surface and referential
    /// invariants.
    pub fn from_parts(pool: Pool, history: History) -> Result<Self, ModelError> {
        let roots = count_root_surfaces(&pool);
        if roots != 1 {
            return Err(ModelError::RootSurfaceCount(roots));
        }
        pool.validate()?;
        Ok(Self {
            pool,
            history,
            runtime: None,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn root_surface(&self) -> EntityId {
        self.pool
            .find_children(EntityFilter::SURFACES, None)
            .find(|e| e.is_root_surface())
            .map(|e| e.id)
            .expect("model root always holds a root surface")
    }

    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        self.history.append(action, &mut self.pool)
    }

    pub fn undo(&mut self) -> Result<bool, ActionError> {
        self.history.undo(&mut self.pool)
    }

    pub fn redo(&mut self) -> Result<bool, ActionError> {
        self.history.redo(&mut self.pool)
    }

    /// Bind a runtime, releasing any previous one.
    pub fn attach_runtime(&mut self, mut runtime: Box<dyn ExecutionContext>) {
        self.detach_runtime();
        runtime.attached(self.root_surface());
        self.runtime = Some(runtime);
    }

    pub fn detach_runtime(&mut self) -> Option<Box<dyn ExecutionContext>> {
        let mut runtime = self.runtime.take()?;
        runtime.detached();
        Some(runtime)
    }

    pub fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Tear the document down: release the runtime, drop the history and
    /// destroy every entity. Returns how many entities were destroyed.
    pub fn destroy(mut self) -> usize {
        self.detach_runtime();
        self.history.clear();
        let destroyed = self.pool.clear();
        log::debug!(target: "pool", "destroyed model root ({} entities)", destroyed);
        destroyed
    }
}

impl Default for ModelRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ModelRoot {
    fn drop(&mut self) {
        self.detach_runtime();
    }
}

impl fmt::Debug for ModelRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRoot")
            .field("entities", &self.pool.len())
            .field("can_undo", &self.history.can_undo())
            .field("can_redo", &self.history.can_redo())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

fn count_root_surfaces(pool: &Pool) -> usize {
    pool.find_children(EntityFilter::SURFACES, None)
        .filter(|e| e.is_root_surface())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_types::{EntityKind, GridPos, Surface};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl ExecutionContext for Recorder {
        fn attached(&mut self, root_surface: EntityId) {
            self.0.borrow_mut().push(format!("attached {}", root_surface));
        }
        fn detached(&mut self) {
            self.0.borrow_mut().push("detached".to_string());
        }
    }

    #[test]
    fn new_root_has_one_root_surface() {
        let root = ModelRoot::new();
        assert_eq!(root.pool().len(), 1);
        assert!(root.pool().get(root.root_surface()).unwrap().is_root_surface());
    }

    #[test]
    fn zero_root_surfaces_is_an_error() {
        let err = ModelRoot::from_pool(Pool::new()).unwrap_err();
        assert_eq!(err, ModelError::RootSurfaceCount(0));
    }

    #[test]
    fn two_root_surfaces_is_an_error() {
        let mut pool = Pool::new();
        pool.register(Entity::root_surface(EntityId::generate())).unwrap();
        pool.register(Entity::root_surface(EntityId::generate())).unwrap();
        assert_eq!(
            ModelRoot::from_pool(pool).unwrap_err(),
            ModelError::RootSurfaceCount(2)
        );
    }

    #[test]
    fn parentless_group_surface_is_not_a_root() {
        let mut pool = Pool::new();
        pool.register(Entity::new(
            EntityId::generate(),
            None,
            EntityKind::Surface(Surface::group()),
        ))
        .unwrap();
        assert_eq!(
            ModelRoot::from_pool(pool).unwrap_err(),
            ModelError::RootSurfaceCount(0)
        );
    }

    #[test]
    fn stray_group_surface_beside_the_root_is_rejected() {
        let mut pool = Pool::new();
        pool.register(Entity::root_surface(EntityId::generate())).unwrap();
        let stray = EntityId::generate();
        pool.register(Entity::new(stray, None, EntityKind::Surface(Surface::group())))
            .unwrap();
        assert_eq!(
            ModelRoot::from_pool(pool).unwrap_err(),
            ModelError::Pool(PoolError::MisplacedSurface(stray))
        );
    }

    #[test]
    fn runtime_is_notified_on_attach_and_drop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut root = ModelRoot::new();
        let surface = root.root_surface();
        root.attach_runtime(Box::new(Recorder(log.clone())));
        assert!(root.has_runtime());
        drop(root);
        assert_eq!(
            *log.borrow(),
            vec![format!("attached {}", surface), "detached".to_string()]
        );
    }

    #[test]
    fn destroy_removes_everything() {
        let mut root = ModelRoot::new();
        let surface = root.root_surface();
        root.apply(Action::create_group_node(surface, GridPos::ORIGIN, "g"))
            .unwrap();
        assert_eq!(root.destroy(), 3);
    }
}
