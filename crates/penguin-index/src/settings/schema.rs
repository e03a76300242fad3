use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::load::default_index_dir;
use crate::IndexPaths;
use crate::scanner::{DEFAULT_QUEUE_CAPACITY, ScanOptions};

/// Top-level indexer settings loaded from `config.toml`.
///
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/penguin-tunes/config.toml`
/// or `~/.config/penguin-tunes/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PENGUIN_TUNES__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub library: LibrarySettings,
}

impl Settings {
    pub fn index_paths(&self) -> IndexPaths {
        IndexPaths::under(&self.index.dir)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.index.debounce_ms)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            concurrency: self.index.scan_concurrency,
            queue_capacity: self.index.queue_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Directory holding `index.json` and `covers/`
    pub dir: PathBuf,
    /// Quiet period before watcher changes are persisted (milliseconds).
    pub debounce_ms: u64,
    /// Scanner worker threads. 0 uses the available parallelism.
    pub scan_concurrency: usize,
    /// Bounded queue between the directory walk and the workers.
    pub queue_capacity: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            debounce_ms: 1000,
            scan_concurrency: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Root directories to scan and watch
    pub source_dirs: Vec<PathBuf>,
}
