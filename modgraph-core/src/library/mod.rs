//! Collections of reusable modules and the import/merge flow between them.

mod entry;

pub use entry::LibraryEntry;

use std::collections::{BTreeSet, HashSet};

use modgraph_types::LibraryEvent;
use uuid::Uuid;

use crate::events::{Emitter, SubscriptionId};

/// What to do when an imported entry shares a base id with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    KeepOld,
    KeepNew,
    /// Keep both; the incoming entry gets a fresh base id.
    KeepBoth,
    /// Abort the whole import.
    Cancel,
}

impl ConflictResolution {
    /// The newer revision wins; identical revisions keep what is there.
    pub fn default_for(existing: &LibraryEntry, incoming: &LibraryEntry) -> Self {
        if existing.modification_id() == incoming.modification_id() {
            return ConflictResolution::KeepOld;
        }
        if incoming.modification_time() > existing.modification_time() {
            ConflictResolution::KeepNew
        } else {
            ConflictResolution::KeepOld
        }
    }
}

#[derive(Debug, Default)]
pub struct Library {
    entries: Vec<LibraryEntry>,
    events: Emitter<LibraryEvent>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt stored entries. Base ids are unique within a library, so an
    /// entry repeating an earlier base id is kept under a fresh one.
    pub fn from_entries(mut entries: Vec<LibraryEntry>) -> Self {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &mut entries {
            if !seen.insert(entry.base_id()) {
                let duplicate = entry.base_id();
                entry.rekey();
                log::warn!(
                    target: "library",
                    "entry '{}' repeats base id {}; rekeyed to {}",
                    entry.name(),
                    duplicate,
                    entry.base_id()
                );
                seen.insert(entry.base_id());
            }
        }
        Self {
            entries,
            events: Emitter::new(),
        }
    }

    /// Add an entry. An entry with the same base id is replaced in place and
    /// handed back.
    pub fn add_entry(&mut self, entry: LibraryEntry) -> Option<LibraryEntry> {
        let base = entry.base_id();
        if let Some(slot) = self.entries.iter_mut().find(|e| e.base_id() == base) {
            let old = std::mem::replace(slot, entry);
            self.events.emit(&LibraryEvent::EntryRemoved(base));
            self.events.emit(&LibraryEvent::EntryAdded(base));
            return Some(old);
        }
        self.entries.push(entry);
        self.events.emit(&LibraryEvent::EntryAdded(base));
        None
    }

    /// Remove and tear down an entry. False if no entry has `base_id`.
    pub fn remove_entry(&mut self, base_id: Uuid) -> bool {
        let Some(index) = self.position(base_id) else {
            return false;
        };
        let entry = self.entries.remove(index);
        entry.remove();
        self.events.emit(&LibraryEvent::EntryRemoved(base_id));
        true
    }

    pub fn entry(&self, base_id: Uuid) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.base_id() == base_id)
    }

    pub fn entry_mut(&mut self, base_id: Uuid) -> Option<&mut LibraryEntry> {
        self.entries.iter_mut().find(|e| e.base_id() == base_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LibraryEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every tag used by any entry, sorted.
    pub fn tags(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|e| e.tags().iter().cloned())
            .collect()
    }

    pub fn entries_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a LibraryEntry> + 'a {
        self.entries.iter().filter(move |e| e.has_tag(tag))
    }

    /// Merge `other` into this library.
    ///
    /// `resolver` is asked once per incoming entry whose base id is already
    /// present, before anything changes. Base ids within `other` are already
    /// distinct, so incoming entries never collide with each other. If any answer is `Cancel` the import
    /// is abandoned and `false` returned with this library untouched.
    pub fn import<F>(&mut self, other: Library, mut resolver: F) -> bool
    where
        F: FnMut(&LibraryEntry, &LibraryEntry) -> ConflictResolution,
    {
        let mut resolutions = Vec::with_capacity(other.entries.len());
        for incoming in &other.entries {
            let resolution = self
                .entry(incoming.base_id())
                .map(|existing| resolver(existing, incoming));
            if resolution == Some(ConflictResolution::Cancel) {
                log::info!(target: "library", "import cancelled at '{}'", incoming.name());
                return false;
            }
            resolutions.push(resolution);
        }

        let Library { entries, .. } = other;
        let (mut added, mut replaced, mut kept) = (0, 0, 0);
        for (mut incoming, resolution) in entries.into_iter().zip(resolutions) {
            match resolution {
                None => {
                    self.add_entry(incoming);
                    added += 1;
                }
                Some(ConflictResolution::KeepOld) => kept += 1,
                Some(ConflictResolution::KeepNew) => {
                    if let Some(old) = self.add_entry(incoming) {
                        old.remove();
                    }
                    replaced += 1;
                }
                Some(ConflictResolution::KeepBoth) => {
                    incoming.rekey();
                    self.add_entry(incoming);
                    added += 1;
                }
                Some(ConflictResolution::Cancel) => unreachable!("cancel handled above"),
            }
        }
        log::info!(
            target: "library",
            "import: {} added, {} replaced, {} kept",
            added,
            replaced,
            kept
        );
        true
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LibraryEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn position(&self, base_id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.base_id() == base_id)
    }
}
