//! Source directory configuration collaborator.
//!
//! The scanner and watcher only ever need the current list of root
//! directories. Where that list is stored is the embedding application's
//! business; `SharedSourceDirs` is the in-memory implementation.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Read access to the configured library roots
pub trait SourceDirs: Send + Sync {
    fn source_dirs(&self) -> Vec<PathBuf>;
}

impl SourceDirs for Vec<PathBuf> {
    fn source_dirs(&self) -> Vec<PathBuf> {
        self.clone()
    }
}

/// Thread-safe, updatable list of library roots
#[derive(Debug, Default)]
pub struct SharedSourceDirs {
    dirs: RwLock<Vec<PathBuf>>,
}

impl SharedSourceDirs {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs: RwLock::new(dirs),
        }
    }

    /// Replace the configured roots. Returns true if the list changed.
    pub fn set(&self, dirs: Vec<PathBuf>) -> bool {
        let mut guard = self.dirs.write();
        if *guard == dirs {
            return false;
        }
        *guard = dirs;
        true
    }

    /// Add a root if not already present. Returns true if it was added.
    pub fn add(&self, dir: PathBuf) -> bool {
        let mut guard = self.dirs.write();
        if guard.contains(&dir) {
            return false;
        }
        guard.push(dir);
        true
    }

    /// Remove a root. Returns true if it was present.
    pub fn remove(&self, dir: &Path) -> bool {
        let mut guard = self.dirs.write();
        let before = guard.len();
        guard.retain(|d| d.as_path() != dir);
        guard.len() != before
    }
}

impl SourceDirs for SharedSourceDirs {
    fn source_dirs(&self) -> Vec<PathBuf> {
        self.dirs.read().clone()
    }
}
