//! penguin-core: Core types for the penguin-tunes library indexer
//!
//! This crate contains the plain data types and collaborator traits shared
//! between the indexing engine and whatever application embeds it.
//!
//! # Architecture
//!
//! The crate is organized as follows:
//! - `track`: the `Track` record and its path-derived id
//! - `audio`: recognized audio file extensions
//! - `events`: index change events and the `EventEmitter` capability
//! - `sources`: the `SourceDirs` configuration collaborator
//!
//! # Usage
//!
//! ```ignore
//! use penguin_core::{Track, track_id};
//!
//! let track = Track::fallback("/music/song.mp3");
//! assert_eq!(track.id, track_id("/music/song.mp3"));
//! ```

pub mod audio;
pub mod events;
pub mod sources;
pub mod track;

// Re-export commonly used types at crate root for convenience
pub use audio::{AUDIO_EXTENSIONS, is_audio_file};
pub use events::{EventEmitter, IndexUpdatedEvent, NoopEmitter, UpdateReason};
pub use sources::{SharedSourceDirs, SourceDirs};
pub use track::{Track, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_COMPOSER, track_id};
