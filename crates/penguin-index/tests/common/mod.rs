// Shared helpers for integration tests
#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender, unbounded};
use penguin_core::EventEmitter;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Emitter that forwards every event into a channel
pub struct ChannelEmitter {
    tx: Sender<(String, Option<serde_json::Value>)>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, Receiver<(String, Option<serde_json::Value>)>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: &str, payload: Option<serde_json::Value>) -> Result<(), String> {
        self.tx
            .send((event.to_string(), payload))
            .map_err(|e| e.to_string())
    }
}

/// Write a file that is named like audio but carries no readable tags
pub fn write_fake_audio(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"no tags in here").unwrap();
}

pub fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Drain everything received within `window`
pub fn collect_events(
    rx: &Receiver<(String, Option<serde_json::Value>)>,
    window: Duration,
) -> Vec<(String, Option<serde_json::Value>)> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Ok(event) = rx.recv_deadline(deadline) {
        events.push(event);
    }
    events
}

/// Create `<base>/library`. The result is canonical, which is how the
/// scanner and the watcher key tracks.
pub fn library_dir(base: &Path) -> PathBuf {
    let library = base.join("library");
    fs::create_dir_all(&library).unwrap();
    library.canonicalize().unwrap()
}
