//! Track record and path-derived identity.
//!
//! A `Track` is keyed by its absolute path. The `id` is a SHA-256 digest of
//! that path, so re-extracting a file always yields the same id and the same
//! cover-art filename.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_COMPOSER: &str = "Unknown Composer";

/// Metadata for a single audio file
///
/// Missing fields in a persisted snapshot deserialize to empty/zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: String,
    pub path: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub composer: String,
    pub genre: String,
    /// Zero when unknown
    pub track_number: u32,
    /// Path to the extracted cover image, empty when there is none
    pub cover: String,
    /// Zero when unknown
    pub year: u32,
}

impl Track {
    /// Placeholder record for a file whose tags could not be read.
    pub fn fallback(path: impl AsRef<Path>) -> Self {
        let path = absolute_path(path.as_ref());
        Track {
            id: digest(&path),
            title: base_name(&path),
            album: UNKNOWN_ALBUM.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            path: path.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    pub fn has_cover(&self) -> bool {
        !self.cover.is_empty()
    }
}

/// Deterministic id for the file at `path`.
///
/// Relative paths are resolved against the current directory first, so the
/// same file always maps to the same id.
pub fn track_id(path: impl AsRef<Path>) -> String {
    digest(&absolute_path(path.as_ref()))
}

/// Absolute form of `path` without touching the filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Canonical form of `path`, resolving symlinks.
///
/// A path that no longer exists resolves through its parent directory, so a
/// deleted file maps to the same key it was indexed under. Falls back to
/// `absolute_path` when nothing along the way can be resolved.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = absolute_path(path);
    let resolved = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|parent| parent.join(name)),
        _ => None,
    };
    resolved.unwrap_or(absolute)
}

/// Final path component, used as the title fallback.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn digest(absolute: &Path) -> String {
    let hash = Sha256::digest(absolute.to_string_lossy().as_bytes());
    format!("{:x}", hash)
}
