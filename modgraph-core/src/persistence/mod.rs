//! Versioned binary persistence.
//!
//! Every file starts with `[u32 magic][u32 version]` (big-endian). The magic
//! tells projects from libraries; the version must lie within
//! `[MIN_SCHEMA_VERSION, SCHEMA_VERSION]`. Both are checked before any body
//! bytes are read, so a rejected file never produces a partial graph.

pub mod codec;
pub mod load;
pub mod save;
pub mod schema;

pub use codec::{StreamReader, StreamWriter};
pub use schema::{FileKind, LIBRARY_MAGIC, MIN_SCHEMA_VERSION, PROJECT_MAGIC, SCHEMA_VERSION};

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use modgraph_types::PoolError;

use crate::config::Config;
use crate::history::DEFAULT_MAX_DEPTH;
use crate::library::Library;
use crate::lock::LibraryLockGuard;
use crate::model_root::ModelError;
use crate::project::Project;

#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    /// Not a file of the expected kind.
    BadMagic { expected: u32, found: u32 },
    IncompatibleVersion { version: u32, min: u32, max: u32 },
    Corrupt(String),
    Model(ModelError),
}

impl LoadError {
    /// Version declared by a rejected stream; 0 when the header was not
    /// recognised or the failure came later.
    pub fn read_version(&self) -> u32 {
        match self {
            Self::IncompatibleVersion { version, .. } => *version,
            _ => 0,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::BadMagic { expected, found } => write!(
                f,
                "not a recognized file (magic {:#010x}, expected {:#010x})",
                found, expected
            ),
            Self::IncompatibleVersion { version, min, max } => write!(
                f,
                "incompatible schema version {} (supported {}..={})",
                version, min, max
            ),
            Self::Corrupt(msg) => write!(f, "corrupt file: {}", msg),
            Self::Model(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ModelError> for LoadError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<PoolError> for LoadError {
    fn from(e: PoolError) -> Self {
        Self::Model(ModelError::Pool(e))
    }
}

/// Settings that shape what is written and how history is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    pub save_history: bool,
    pub history_depth: usize,
}

impl PersistOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            save_history: config.save_history(),
            history_depth: config.history_max_depth(),
        }
    }
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            save_history: true,
            history_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Write a project file atomically: a sibling temp file is written in full,
/// then renamed over `path`.
pub fn save_project_file(path: &Path, project: &Project, options: &PersistOptions) -> io::Result<()> {
    write_atomically(path, |w| {
        save::write_project(w, project, options.save_history, |_| Ok(()))
    })?;
    log::info!(target: "persistence", "saved project to {}", path.display());
    Ok(())
}

pub fn load_project_file(path: &Path, options: &PersistOptions) -> Result<Project, LoadError> {
    let mut reader = StreamReader::new(BufReader::new(File::open(path)?));
    load::read_project(&mut reader, options.history_depth, |_, _| Ok(None))
}

/// Requires the library lock so concurrent editors never interleave writes.
pub fn save_library_file(path: &Path, library: &Library, _lock: &LibraryLockGuard) -> io::Result<()> {
    write_atomically(path, |w| save::write_library(w, library))?;
    log::info!(target: "persistence", "saved library to {}", path.display());
    Ok(())
}

pub fn load_library_file(path: &Path, _lock: &LibraryLockGuard) -> Result<Library, LoadError> {
    let mut reader = StreamReader::new(BufReader::new(File::open(path)?));
    load::read_library(&mut reader)
}

/// Magic and version of a file, without the version gate.
pub fn read_file_header(path: &Path) -> Result<(FileKind, u32), LoadError> {
    let mut reader = StreamReader::new(BufReader::new(File::open(path)?));
    let magic = reader.read_u32()?;
    let kind = FileKind::from_magic(magic).ok_or(LoadError::BadMagic {
        expected: PROJECT_MAGIC,
        found: magic,
    })?;
    Ok((kind, reader.read_u32()?))
}

/// `demo.axp` stages as `demo.axp.tmp`, so sibling files never share one.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut StreamWriter<BufWriter<File>>) -> io::Result<()>,
{
    let tmp = temp_path(path);
    let result = (|| {
        let mut writer = StreamWriter::new(BufWriter::new(File::create(&tmp)?));
        write(&mut writer)?;
        let file = writer
            .into_inner()
            .into_inner()
            .map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
