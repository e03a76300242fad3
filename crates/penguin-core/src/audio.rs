//! Recognized audio file extensions.

use std::path::Path;

/// Supported audio file extensions (lowercase, without the dot)
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "wav", "ogg", "opus", "aac", "wma"];

/// Check if a path has a supported audio extension (case-insensitive)
pub fn is_audio_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
