//! Embedded cover art extraction.
//!
//! Covers are written to `<cover_dir>/<track id><ext>`. The track id is a
//! pure function of the audio file's path, so re-extracting a file
//! overwrites its previous cover instead of leaving orphans behind.

use lofty::picture::{MimeType, Picture};
use lofty::tag::Tag;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File extension for a cover with the given MIME type
pub fn cover_extension(mime_type: Option<&MimeType>) -> &'static str {
    match mime_type {
        Some(MimeType::Png) => ".png",
        Some(MimeType::Unknown(mime)) if mime.to_ascii_lowercase().contains("png") => ".png",
        _ => ".jpg",
    }
}

/// Path the cover for track `id` is stored at
pub fn cover_path(cover_dir: &Path, id: &str, mime_type: Option<&MimeType>) -> PathBuf {
    cover_dir.join(format!("{id}{}", cover_extension(mime_type)))
}

/// Write the first embedded picture of `tag`, if any.
///
/// Returns the written path. Write failures are logged and reported as
/// "no cover".
pub fn save_embedded_cover(tag: &Tag, id: &str, cover_dir: &Path) -> Option<PathBuf> {
    let picture: &Picture = tag.pictures().first()?;
    let target = cover_path(cover_dir, id, picture.mime_type());

    match write_cover(&target, picture.data()) {
        Ok(()) => Some(target),
        Err(e) => {
            warn!(path = %target.display(), error = %e, "Failed to write cover art");
            None
        }
    }
}

/// Write raw image bytes to `target`, creating the cover directory if needed
pub fn write_cover(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(target, data)
}
