//! Notification payloads.
//!
//! Emitted by `modgraph-core` after a state change has completed. Listeners
//! receive these by reference and cannot reach back into the emitter.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEntryEvent {
    NameChanged(String),
    TagAdded(String),
    TagRemoved(String),
    /// The entry was removed from its library. Followed by `Cleanup`.
    Removed,
    /// Last event an entry emits; listeners should drop their state.
    Cleanup,
}

/// Entries are identified by base id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryEvent {
    EntryAdded(Uuid),
    EntryRemoved(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    DirtyChanged(bool),
    LinkedFileChanged(Option<String>),
}
