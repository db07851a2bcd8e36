//! A named, tagged, independently versioned module.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use modgraph_types::{Action, ActionError, LibraryEntryEvent, Pool};
use uuid::Uuid;

use crate::events::{Emitter, SubscriptionId};
use crate::history::History;
use crate::model_root::{ExecutionContext, ModelError, ModelRoot};

/// Current UTC time at the precision the file format stores.
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Debug)]
pub struct LibraryEntry {
    name: String,
    base_id: Uuid,
    modification_id: Uuid,
    modification_time: DateTime<Utc>,
    tags: BTreeSet<String>,
    root: ModelRoot,
    events: Emitter<LibraryEntryEvent>,
}

impl LibraryEntry {
    /// A new entry with an empty root surface and fresh ids.
    pub fn create<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            base_id: Uuid::new_v4(),
            modification_id: Uuid::new_v4(),
            modification_time: now_millis(),
            tags: tags.into_iter().map(Into::into).collect(),
            root: ModelRoot::new(),
            events: Emitter::new(),
        }
    }

    /// Rebuild a stored entry. Nothing is re-stamped, but the time is
    /// truncated to the millisecond precision files keep.
    pub fn from_parts(
        name: String,
        base_id: Uuid,
        modification_id: Uuid,
        modification_time: DateTime<Utc>,
        tags: BTreeSet<String>,
        pool: Pool,
    ) -> Result<Self, ModelError> {
        let root = ModelRoot::from_parts(pool, History::default())?;
        Ok(Self {
            name,
            base_id,
            modification_id,
            modification_time: modification_time.trunc_subsecs(3),
            tags,
            root,
            events: Emitter::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity shared by every revision of this module.
    pub fn base_id(&self) -> Uuid {
        self.base_id
    }

    pub fn modification_id(&self) -> Uuid {
        self.modification_id
    }

    pub fn modification_time(&self) -> DateTime<Utc> {
        self.modification_time
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn root(&self) -> &ModelRoot {
        &self.root
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.name {
            return;
        }
        self.name = name;
        self.events
            .emit(&LibraryEntryEvent::NameChanged(self.name.clone()));
    }

    /// False if the tag was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if !self.tags.insert(tag.clone()) {
            return false;
        }
        self.events.emit(&LibraryEntryEvent::TagAdded(tag));
        true
    }

    /// False if the tag was absent.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if !self.tags.remove(tag) {
            return false;
        }
        self.events
            .emit(&LibraryEntryEvent::TagRemoved(tag.to_string()));
        true
    }

    /// Stamp a new revision: fresh modification id and time.
    pub fn modified(&mut self) {
        self.modification_id = Uuid::new_v4();
        self.modification_time = now_millis();
    }

    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        self.root.apply(action)?;
        self.modified();
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, ActionError> {
        let undone = self.root.undo()?;
        if undone {
            self.modified();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, ActionError> {
        let redone = self.root.redo()?;
        if redone {
            self.modified();
        }
        Ok(redone)
    }

    pub fn attach_runtime(&mut self, runtime: Box<dyn ExecutionContext>) {
        self.root.attach_runtime(runtime);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LibraryEntryEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Destroy the module's contents, then notify `Removed` and `Cleanup`.
    pub fn remove(self) {
        let LibraryEntry {
            name,
            root,
            mut events,
            ..
        } = self;
        let destroyed = root.destroy();
        log::debug!(target: "library", "removed entry '{}' ({} entities)", name, destroyed);
        events.emit(&LibraryEntryEvent::Removed);
        events.emit(&LibraryEntryEvent::Cleanup);
    }

    /// Give this entry a new identity, keeping its contents.
    pub(crate) fn rekey(&mut self) {
        self.base_id = Uuid::new_v4();
        self.modified();
    }
}
