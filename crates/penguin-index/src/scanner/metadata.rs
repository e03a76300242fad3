//! Metadata extraction using lofty.
//!
//! Extraction never fails because of bad tags. A file whose tags cannot be
//! parsed is still indexed with placeholder metadata; only a file that cannot
//! be opened at all is reported as an error.

use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use penguin_core::track::{base_name, canonical_path};
use penguin_core::{Track, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_COMPOSER};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::scanner::ScanResult;
use crate::scanner::artwork::save_embedded_cover;

/// Extract a `Track` for the audio file at `path`.
///
/// Embedded artwork is written under `cover_dir`. The source file is only
/// opened for reading.
pub fn extract_track(path: &Path, cover_dir: &Path) -> ScanResult<Track> {
    let path = canonical_path(path);
    let file = File::open(&path)?;

    let tagged_file = Probe::new(BufReader::new(file))
        .guess_file_type()
        .ok()
        .and_then(|probe| probe.read().ok());

    let Some(tagged_file) = tagged_file else {
        debug!(path = %path.display(), "Unreadable tags, using fallback metadata");
        return Ok(Track::fallback(&path));
    };

    // Primary tag first, then any tag
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        debug!(path = %path.display(), "No tags found, using fallback metadata");
        return Ok(Track::fallback(&path));
    };

    Ok(track_from_tag(&path, tag, cover_dir))
}

fn track_from_tag(path: &Path, tag: &Tag, cover_dir: &Path) -> Track {
    let mut track = Track::fallback(path);

    track.title = text(tag.title()).unwrap_or_else(|| base_name(path));
    track.album = text(tag.album()).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    track.artist = text(tag.artist()).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    track.composer = text(tag.get_string(&ItemKey::Composer).map(Cow::Borrowed))
        .unwrap_or_else(|| UNKNOWN_COMPOSER.to_string());
    track.genre = text(tag.genre()).unwrap_or_default();
    track.track_number = tag.track().filter(|n| *n > 0).unwrap_or(0);
    track.year = tag.year().unwrap_or(0);

    if let Some(cover) = save_embedded_cover(tag, &track.id, cover_dir) {
        track.cover = cover.to_string_lossy().into_owned();
    }

    track
}

/// Trimmed tag value, `None` when absent or blank
fn text(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
