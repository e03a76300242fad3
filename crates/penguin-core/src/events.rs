//! Index change events.
//!
//! The indexer never talks to a UI directly. It emits named events through
//! an injected `EventEmitter`, and every "index changed" emission carries the
//! same payload: an `IndexUpdatedEvent`. Receivers re-fetch the track list
//! when they need it.

use serde::Serialize;

/// Why the index changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateReason {
    /// Snapshot loaded at startup
    Startup,
    /// A full scan completed
    Scan,
    /// Filesystem changes were applied and persisted
    Watch,
}

/// Emitted when the set of indexed tracks may have changed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexUpdatedEvent {
    pub reason: UpdateReason,
    /// Store mutation counter at the time of emission
    pub revision: u64,
    /// Number of tracks in the store
    pub track_count: usize,
}

impl IndexUpdatedEvent {
    pub const EVENT_NAME: &'static str = "index-updated";

    pub fn new(reason: UpdateReason, revision: u64, track_count: usize) -> Self {
        Self {
            reason,
            revision,
            track_count,
        }
    }
}

/// Sink for named events with an optional JSON payload
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: Option<serde_json::Value>) -> Result<(), String>;

    fn emit_index_updated(&self, event: IndexUpdatedEvent) -> Result<(), String> {
        let payload = serde_json::to_value(&event).map_err(|e| e.to_string())?;
        self.emit(IndexUpdatedEvent::EVENT_NAME, Some(payload))
    }
}

/// Emitter that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: &str, _payload: Option<serde_json::Value>) -> Result<(), String> {
        Ok(())
    }
}
