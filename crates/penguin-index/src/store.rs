//! In-memory track store with atomic JSON snapshots.
//!
//! The store is the single source of truth shared by the scanner workers and
//! the watcher. All access goes through one read-write lock: upserts and
//! removals take the write lock, snapshots and persistence take the read lock,
//! and loading replaces the whole map under the write lock.

use parking_lot::{Mutex, RwLock};
use penguin_core::Track;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// On-disk snapshot layout: `{ "tracks": { "<path>": Track } }`
#[derive(Serialize)]
struct SnapshotRef<'a> {
    tracks: &'a HashMap<String, Track>,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    #[serde(default)]
    tracks: Option<HashMap<String, Track>>,
}

/// Thread-safe mapping from absolute file path to `Track`
#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: RwLock<HashMap<String, Track>>,
    revision: AtomicU64,
    /// Serializes snapshot writers so renames land in snapshot order
    persist_gate: Mutex<()>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry at `track.path`
    pub fn upsert(&self, track: Track) {
        let mut tracks = self.tracks.write();
        tracks.insert(track.path.clone(), track);
        self.bump();
    }

    /// Remove the entry at `path`. Returns the removed track, if any.
    pub fn remove(&self, path: &str) -> Option<Track> {
        let mut tracks = self.tracks.write();
        let removed = tracks.remove(path);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Remove every track located under directory `dir`. Returns how many were removed.
    pub fn remove_under(&self, dir: &Path) -> usize {
        let mut tracks = self.tracks.write();
        let before = tracks.len();
        tracks.retain(|path, _| !Path::new(path).starts_with(dir));
        let removed = before - tracks.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    /// Keep only tracks located under one of `roots`. Returns how many were removed.
    pub fn retain_under(&self, roots: &[PathBuf]) -> usize {
        let mut tracks = self.tracks.write();
        let before = tracks.len();
        tracks.retain(|path, _| roots.iter().any(|root| Path::new(path).starts_with(root)));
        let removed = before - tracks.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    pub fn get(&self, path: &str) -> Option<Track> {
        self.tracks.read().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tracks.read().contains_key(path)
    }

    /// Independent copy of all entries
    pub fn snapshot(&self) -> HashMap<String, Track> {
        self.tracks.read().clone()
    }

    /// All tracks, in no particular order
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }

    /// Monotonic mutation counter
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Write the full store to `path` via a temp file in the same directory and a rename.
    pub fn persist(&self, path: &Path) -> StoreResult<()> {
        let _gate = self.persist_gate.lock();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let tracks = self.tracks.read();
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &SnapshotRef { tracks: &tracks })?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        // Temp files are created owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %path.display(), tracks = tracks.len(), "Persisted index snapshot");
        Ok(())
    }

    /// Replace the in-memory state with the snapshot at `path`.
    ///
    /// A missing file leaves the store empty; malformed content is an error
    /// and leaves the current state untouched.
    pub fn load(&self, path: &Path) -> StoreResult<()> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No index snapshot, starting empty");
                let mut tracks = self.tracks.write();
                tracks.clear();
                self.bump();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: SnapshotOwned = serde_json::from_slice(&bytes)?;
        let loaded = snapshot.tracks.unwrap_or_default();

        let mut tracks = self.tracks.write();
        *tracks = loaded;
        self.bump();
        debug!(path = %path.display(), tracks = tracks.len(), "Loaded index snapshot");
        Ok(())
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}
