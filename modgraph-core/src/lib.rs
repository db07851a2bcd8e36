//! # modgraph-core
//!
//! Document layer for the modgraph editor: model roots with undo history,
//! projects, tagged module libraries, and the versioned binary file format.
//! Independent of any UI or audio runtime; those bind through
//! [`ExecutionContext`] and subscribe to change events.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modgraph_core::{Config, PersistOptions, Project};
//! use modgraph_core::persistence::save_project_file;
//! use modgraph_types::{Action, GridPos};
//!
//! let config = Config::load();
//! let mut project = Project::new();
//! project.root_mut().history_mut().set_max_depth(config.history_max_depth());
//!
//! let surface = project.root().root_surface();
//! project.apply(Action::create_custom_node(surface, GridPos::new(0, 0), "osc", ""))?;
//! project.undo()?;
//!
//! save_project_file(path, &project, &PersistOptions::from_config(&config))?;
//! ```
//!
//! ## Module Overview
//!
//! - [`model_root`] — `ModelRoot`: one pool, its history, an optional runtime
//! - [`history`] — undo/redo stacks of actions
//! - [`project`] — `Project`: main root, library, linked file, dirty flag
//! - [`library`] — `LibraryEntry`, `Library`, import conflict resolution
//! - [`persistence`] — binary codec, schema versions, save/load, file helpers
//! - [`lock`] — cross-process library lock
//! - [`events`] — typed synchronous emitters
//! - [`config`] — TOML configuration (embedded defaults + user override)

pub mod config;
pub mod events;
pub mod history;
pub mod library;
pub mod lock;
pub mod model_root;
pub mod persistence;
pub mod project;

pub use config::Config;
pub use events::{Emitter, SubscriptionId};
pub use history::History;
pub use library::{ConflictResolution, Library, LibraryEntry};
pub use lock::{LibraryLock, LibraryLockGuard};
pub use model_root::{ExecutionContext, ModelError, ModelRoot};
pub use persistence::{LoadError, PersistOptions};
pub use project::Project;
