//! penguin-index: local audio library indexing engine
//!
//! Keeps an in-memory catalog of audio files, fed by a full scanner and a
//! filesystem watcher, and persists it as a JSON snapshot.
//!
//! # Architecture
//!
//! - `store`: the shared `TrackStore` and its snapshot format
//! - `scanner`: metadata extraction, cover art, and the parallel full scan
//! - `watcher`: incremental updates from filesystem notifications
//! - `debounce`: the coalescing persist-and-notify timer
//! - `indexer`: orchestration of store, scans and watcher
//! - `settings`: layered configuration loading

pub mod debounce;
pub mod error;
pub mod indexer;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod watcher;

pub use error::{IndexError, IndexResult};
pub use indexer::Indexer;
pub use scanner::{ScanError, ScanOptions, ScanStats, ScanToken};
pub use settings::Settings;
pub use store::{StoreError, TrackStore};
pub use watcher::{StopHandle, WatchError, Watcher, WatcherState};

use std::path::{Path, PathBuf};

pub const SNAPSHOT_FILE_NAME: &str = "index.json";
pub const COVERS_DIR_NAME: &str = "covers";

/// On-disk layout of an index directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub base: PathBuf,
    /// JSON snapshot of the store
    pub snapshot: PathBuf,
    /// Extracted cover images
    pub covers: PathBuf,
}

impl IndexPaths {
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_path_buf();
        Self {
            snapshot: base.join(SNAPSHOT_FILE_NAME),
            covers: base.join(COVERS_DIR_NAME),
            base,
        }
    }

    /// Create the base and cover directories
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(&self.covers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_paths_layout() {
        let paths = IndexPaths::under("/data/penguin");
        assert_eq!(paths.snapshot, PathBuf::from("/data/penguin/index.json"));
        assert_eq!(paths.covers, PathBuf::from("/data/penguin/covers"));
    }

    #[test]
    fn test_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::under(dir.path().join("a").join("b"));
        paths.create_dirs().unwrap();
        assert!(paths.covers.is_dir());
    }
}
