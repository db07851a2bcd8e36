//! The top-level document: main model root plus the project's library.

use std::fmt;

use modgraph_types::{Action, ActionError, ProjectEvent};

use crate::events::{Emitter, SubscriptionId};
use crate::library::Library;
use crate::model_root::{ExecutionContext, ModelRoot};

pub struct Project {
    root: ModelRoot,
    library: Library,
    linked_file: Option<String>,
    dirty: bool,
    backend: Option<Box<dyn ExecutionContext>>,
    events: Emitter<ProjectEvent>,
}

impl Project {
    pub fn new() -> Self {
        Self::from_parts(ModelRoot::new(), Library::new(), None)
    }

    pub fn from_parts(root: ModelRoot, library: Library, linked_file: Option<String>) -> Self {
        Self {
            root,
            library,
            linked_file,
            dirty: false,
            backend: None,
            events: Emitter::new(),
        }
    }

    pub fn root(&self) -> &ModelRoot {
        &self.root
    }

    /// Direct access for runtime binding and history settings. Edits should
    /// go through [`apply`](Self::apply) so the project is marked dirty.
    pub fn root_mut(&mut self) -> &mut ModelRoot {
        &mut self.root
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn linked_file(&self) -> Option<&str> {
        self.linked_file.as_deref()
    }

    pub fn set_linked_file(&mut self, path: Option<String>) {
        if path == self.linked_file {
            return;
        }
        self.linked_file = path;
        self.events
            .emit(&ProjectEvent::LinkedFileChanged(self.linked_file.clone()));
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty == self.dirty {
            return;
        }
        self.dirty = dirty;
        self.events.emit(&ProjectEvent::DirtyChanged(dirty));
    }

    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        self.root.apply(action)?;
        self.set_dirty(true);
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, ActionError> {
        let undone = self.root.undo()?;
        if undone {
            self.set_dirty(true);
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, ActionError> {
        let redone = self.root.redo()?;
        if redone {
            self.set_dirty(true);
        }
        Ok(redone)
    }

    /// Bind an audio backend to the project, releasing any previous one.
    pub fn attach_backend(&mut self, mut backend: Box<dyn ExecutionContext>) {
        self.detach_backend();
        backend.attached(self.root.root_surface());
        self.backend = Some(backend);
    }

    pub fn detach_backend(&mut self) -> Option<Box<dyn ExecutionContext>> {
        let mut backend = self.backend.take()?;
        backend.detached();
        Some(backend)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ProjectEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.detach_backend();
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("library", &self.library.len())
            .field("linked_file", &self.linked_file)
            .field("dirty", &self.dirty)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_types::{EntityId, GridPos};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(project: &mut Project) -> Rc<RefCell<Vec<ProjectEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        project.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn edits_mark_dirty_once() {
        let mut project = Project::new();
        let seen = recording(&mut project);
        let surface = project.root().root_surface();
        project
            .apply(Action::create_custom_node(surface, GridPos::ORIGIN, "a", ""))
            .unwrap();
        project.undo().unwrap();
        assert!(project.is_dirty());
        project.set_dirty(false);
        assert_eq!(
            *seen.borrow(),
            vec![ProjectEvent::DirtyChanged(true), ProjectEvent::DirtyChanged(false)]
        );
    }

    #[test]
    fn empty_undo_leaves_clean() {
        let mut project = Project::new();
        assert_eq!(project.undo(), Ok(false));
        assert!(!project.is_dirty());
    }

    #[test]
    fn linked_file_change_is_notified() {
        let mut project = Project::new();
        let seen = recording(&mut project);
        project.set_linked_file(Some("a.axp".into()));
        project.set_linked_file(Some("a.axp".into()));
        assert_eq!(project.linked_file(), Some("a.axp"));
        assert_eq!(
            *seen.borrow(),
            vec![ProjectEvent::LinkedFileChanged(Some("a.axp".into()))]
        );
    }

    #[test]
    fn backend_sees_main_root_surface() {
        struct Backend(Rc<RefCell<Option<EntityId>>>);
        impl ExecutionContext for Backend {
            fn attached(&mut self, root_surface: EntityId) {
                *self.0.borrow_mut() = Some(root_surface);
            }
        }
        let bound = Rc::new(RefCell::new(None));
        let mut project = Project::new();
        project.attach_backend(Box::new(Backend(bound.clone())));
        assert_eq!(*bound.borrow(), Some(project.root().root_surface()));
        assert!(project.detach_backend().is_some());
        assert!(!project.has_backend());
    }
}
