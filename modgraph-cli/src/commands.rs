//! Subcommands. Each writes its report to `out` so it can be tested.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use modgraph_core::persistence::{
    self, load_library_file, load_project_file, read_file_header, FileKind,
};
use modgraph_core::{
    Library, LibraryEntry, LibraryLock, LoadError, ModelRoot, PersistOptions, Project,
};
use modgraph_types::{Entity, EntityType};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Io(io::Error),
    Load(LoadError),
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Io(e) => write!(f, "{}", e),
            Self::Load(e) => write!(f, "{}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<LoadError> for CliError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ============================================================================
// info
// ============================================================================

pub fn info(path: &Path, lock: &LibraryLock, options: &PersistOptions, out: &mut impl Write) -> Result<(), CliError> {
    let (kind, version) = read_file_header(path)?;
    writeln!(out, "{}: {} file, schema version {}", path.display(), kind.as_str(), version)?;
    if let Err(e) = persistence::load::check_version(version) {
        writeln!(out, "  {}", e)?;
        return Ok(());
    }
    match kind {
        FileKind::Project => {
            let project = load_project_file(path, options)?;
            writeln!(
                out,
                "  linked file: {}",
                project.linked_file().unwrap_or("(none)")
            )?;
            write_root_summary(out, project.root())?;
            writeln!(
                out,
                "  history: {} undo, {} redo",
                project.root().history().undo_actions().count(),
                project.root().history().redo_actions().count()
            )?;
            writeln!(out, "  library entries: {}", project.library().len())?;
        }
        FileKind::Library => {
            let guard = lock.acquire()?;
            let library = load_library_file(path, &guard)?;
            drop(guard);
            writeln!(out, "  entries: {}", library.len())?;
            for entry in library.entries() {
                let tags: Vec<&str> = entry.tags().iter().map(String::as_str).collect();
                writeln!(
                    out,
                    "  - {} [{}] modified {}",
                    entry.name(),
                    tags.join(", "),
                    entry.modification_time().to_rfc3339()
                )?;
            }
        }
    }
    Ok(())
}

fn write_root_summary(out: &mut impl Write, root: &ModelRoot) -> io::Result<()> {
    let count = |ty: EntityType| root.pool().iter().filter(|e| e.entity_type() == ty).count();
    writeln!(
        out,
        "  entities: {} ({} surfaces, {} nodes, {} controls, {} connections)",
        root.pool().len(),
        count(EntityType::Surface),
        count(EntityType::Node),
        count(EntityType::Control),
        count(EntityType::Connection)
    )
}

// ============================================================================
// dump
// ============================================================================

#[derive(Serialize)]
struct ProjectDump<'a> {
    linked_file: Option<&'a str>,
    entities: Vec<&'a Entity>,
    undo: Vec<&'static str>,
    redo: Vec<&'static str>,
    library: Vec<EntryDump<'a>>,
}

#[derive(Serialize)]
struct EntryDump<'a> {
    name: &'a str,
    base_id: Uuid,
    modification_id: Uuid,
    modification_time: DateTime<Utc>,
    tags: &'a BTreeSet<String>,
    entities: Vec<&'a Entity>,
}

impl<'a> EntryDump<'a> {
    fn new(entry: &'a LibraryEntry) -> Self {
        Self {
            name: entry.name(),
            base_id: entry.base_id(),
            modification_id: entry.modification_id(),
            modification_time: entry.modification_time(),
            tags: entry.tags(),
            entities: entry.root().pool().iter().collect(),
        }
    }
}

fn library_dump(library: &Library) -> Vec<EntryDump<'_>> {
    library.entries().map(EntryDump::new).collect()
}

pub fn dump(path: &Path, lock: &LibraryLock, options: &PersistOptions, out: &mut impl Write) -> Result<(), CliError> {
    let (kind, _) = read_file_header(path)?;
    match kind {
        FileKind::Project => {
            let project = load_project_file(path, options)?;
            let history = project.root().history();
            let dump = ProjectDump {
                linked_file: project.linked_file(),
                entities: project.root().pool().iter().collect(),
                undo: history.undo_actions().map(|a| a.action_type().as_str()).collect(),
                redo: history.redo_actions().map(|a| a.action_type().as_str()).collect(),
                library: library_dump(project.library()),
            };
            serde_json::to_writer_pretty(&mut *out, &dump)?;
        }
        FileKind::Library => {
            let library = {
                let guard = lock.acquire()?;
                load_library_file(path, &guard)?
            };
            serde_json::to_writer_pretty(&mut *out, &library_dump(&library))?;
        }
    }
    writeln!(out)?;
    Ok(())
}

// ============================================================================
// new-project / new-library
// ============================================================================

fn refuse_overwrite(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )));
    }
    Ok(())
}

pub fn new_project(path: &Path, options: &PersistOptions, out: &mut impl Write) -> Result<(), CliError> {
    refuse_overwrite(path)?;
    let project = Project::new();
    persistence::save_project_file(path, &project, options)?;
    writeln!(out, "created project {}", path.display())?;
    Ok(())
}

pub fn new_library(
    path: &Path,
    name: &str,
    tags: &[String],
    lock: &LibraryLock,
    out: &mut impl Write,
) -> Result<(), CliError> {
    refuse_overwrite(path)?;
    let entry = LibraryEntry::create(name, tags.iter().cloned());
    let base = entry.base_id();
    let mut library = Library::new();
    library.add_entry(entry);

    let guard = lock.acquire()?;
    persistence::save_library_file(path, &library, &guard)?;
    drop(guard);
    writeln!(out, "created library {} with entry '{}' ({})", path.display(), name, base)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn setup() -> (tempfile::TempDir, LibraryLock) {
        let dir = tempfile::tempdir().unwrap();
        let lock = LibraryLock::new(dir.path().join("library.lock"), Duration::from_millis(50));
        (dir, lock)
    }

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), CliError>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn new_project_then_info() {
        let (dir, lock) = setup();
        let path = dir.path().join("song.axp");
        let options = PersistOptions::default();
        run(|out| new_project(&path, &options, out));

        let report = run(|out| info(&path, &lock, &options, out));
        assert!(report.contains("project file, schema version 5"));
        assert!(report.contains("entities: 1 (1 surfaces"));
    }

    #[test]
    fn new_project_refuses_to_overwrite() {
        let (dir, _) = setup();
        let path = dir.path().join("song.axp");
        let options = PersistOptions::default();
        run(|out| new_project(&path, &options, out));
        let err = new_project(&path, &options, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Io(e) if e.kind() == io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn new_library_then_dump() {
        let (dir, lock) = setup();
        let path = dir.path().join("modules.axl");
        let tags = vec!["bass".to_string(), "lead".to_string()];
        run(|out| new_library(&path, "Lead Synth", &tags, &lock, out));
        assert!(!lock.is_locked());

        let json = run(|out| dump(&path, &lock, &PersistOptions::default(), out));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "Lead Synth");
        assert_eq!(value[0]["tags"], serde_json::json!(["bass", "lead"]));
        assert_eq!(value[0]["entities"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn info_on_unknown_file_is_bad_magic() {
        let (dir, lock) = setup();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"not a modgraph file").unwrap();
        let err = info(&path, &lock, &PersistOptions::default(), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Load(LoadError::BadMagic { .. })));
    }
}
