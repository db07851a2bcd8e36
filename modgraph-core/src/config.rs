use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::lock::LibraryLock;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    history: HistoryConfig,
    #[serde(default)]
    persistence: PersistenceConfig,
    #[serde(default)]
    library: LibraryConfig,
}

#[derive(Deserialize, Default)]
struct HistoryConfig {
    max_depth: Option<usize>,
}

#[derive(Deserialize, Default)]
struct PersistenceConfig {
    save_history: Option<bool>,
}

#[derive(Deserialize, Default)]
struct LibraryConfig {
    lock_timeout_ms: Option<u64>,
    lock_path: Option<PathBuf>,
}

pub struct Config {
    history: HistoryConfig,
    persistence: PersistenceConfig,
    library: LibraryConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match Self::parse_override(&contents) {
                        Ok(user) => base.merge(user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config::from_file(base)
    }

    /// Embedded defaults only, ignoring any user file.
    pub fn embedded() -> Self {
        Config::from_file(
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml"),
        )
    }

    /// Embedded defaults with `contents` layered on top.
    pub fn from_override(contents: &str) -> Result<Self, toml::de::Error> {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        base.merge(Self::parse_override(contents)?);
        Ok(Config::from_file(base))
    }

    fn parse_override(contents: &str) -> Result<ConfigFile, toml::de::Error> {
        toml::from_str(contents)
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            history: file.history,
            persistence: file.persistence,
            library: file.library,
        }
    }

    /// Undo depth per document (clamped to 1..=100000).
    pub fn history_max_depth(&self) -> usize {
        self.history
            .max_depth
            .unwrap_or(crate::history::DEFAULT_MAX_DEPTH)
            .clamp(1, 100_000)
    }

    /// Whether project files carry the undo/redo stacks.
    pub fn save_history(&self) -> bool {
        self.persistence.save_history.unwrap_or(true)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.library.lock_timeout_ms.unwrap_or(5_000))
    }

    /// Configured lock path, else the platform default.
    pub fn lock_path(&self) -> Option<PathBuf> {
        self.library.lock_path.clone().or_else(LibraryLock::default_path)
    }

    pub fn library_lock(&self) -> Option<LibraryLock> {
        self.lock_path()
            .map(|path| LibraryLock::new(path, self.lock_timeout()))
    }
}

impl ConfigFile {
    fn merge(&mut self, user: ConfigFile) {
        merge_history(&mut self.history, user.history);
        merge_persistence(&mut self.persistence, user.persistence);
        merge_library(&mut self.library, user.library);
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("modgraph").join("config.toml"))
}

fn merge_history(base: &mut HistoryConfig, user: HistoryConfig) {
    if user.max_depth.is_some() {
        base.max_depth = user.max_depth;
    }
}

fn merge_persistence(base: &mut PersistenceConfig, user: PersistenceConfig) {
    if user.save_history.is_some() {
        base.save_history = user.save_history;
    }
}

fn merge_library(base: &mut LibraryConfig, user: LibraryConfig) {
    if user.lock_timeout_ms.is_some() {
        base.lock_timeout_ms = user.lock_timeout_ms;
    }
    if user.lock_path.is_some() {
        base.lock_path = user.lock_path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_config() {
        let config = Config::embedded();
        assert_eq!(config.history_max_depth(), 500);
        assert!(config.save_history());
        assert_eq!(config.lock_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_override_keeps_unset_keys() {
        let config = Config::from_override("[persistence]\nsave_history = false\n").unwrap();
        assert!(!config.save_history());
        assert_eq!(config.history_max_depth(), 500);
    }

    #[test]
    fn test_max_depth_is_clamped() {
        let zero = Config::from_override("[history]\nmax_depth = 0\n").unwrap();
        assert_eq!(zero.history_max_depth(), 1);
        let huge = Config::from_override("[history]\nmax_depth = 9999999\n").unwrap();
        assert_eq!(huge.history_max_depth(), 100_000);
    }

    #[test]
    fn test_lock_path_override() {
        let config =
            Config::from_override("[library]\nlock_path = \"/tmp/x.lock\"\nlock_timeout_ms = 10\n")
                .unwrap();
        let lock = config.library_lock().unwrap();
        assert_eq!(lock.path(), std::path::Path::new("/tmp/x.lock"));
        assert_eq!(config.lock_timeout(), Duration::from_millis(10));
    }

    #[test]
    fn test_malformed_override_is_an_error() {
        assert!(Config::from_override("[history\nmax_depth = ").is_err());
    }
}
