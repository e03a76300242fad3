//! Filesystem watcher that keeps the store in sync incrementally.
//!
//! One notify subscription per `Watcher`, drained by a single event-loop
//! thread, so events for the same path are applied in delivery order.
//! Every store mutation restarts the debounce timer; when it fires the
//! snapshot is persisted and one `index-updated` event is emitted.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, unbounded};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use penguin_core::track::canonical_path;
use penguin_core::{EventEmitter, IndexUpdatedEvent, SourceDirs, UpdateReason, is_audio_file};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::IndexPaths;
use crate::debounce::Debouncer;
use crate::scanner::{extract_track, normalize_roots};
use crate::store::TrackStore;

/// Watcher error types
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watcher is closed")]
    Closed,

    #[error("Watcher is already running")]
    AlreadyRunning,

    #[error("Failed to spawn watcher thread: {0}")]
    Thread(#[from] std::io::Error),
}

pub type WatchResult<T> = Result<T, WatchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Closed,
}

/// Stops a running event loop. Cloneable; stopping more than once is a no-op.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl StopHandle {
    fn new(tx: Sender<()>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Disconnecting the channel is the stop signal.
    pub fn stop(&self) {
        self.tx.lock().take();
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.lock().is_none()
    }
}

#[derive(Default)]
struct Subscription {
    watcher: Option<RecommendedWatcher>,
    dirs: HashSet<PathBuf>,
}

struct Shared {
    store: Arc<TrackStore>,
    covers: PathBuf,
    state: Mutex<WatcherState>,
    subscription: Mutex<Subscription>,
    debouncer: Debouncer,
}

pub struct Watcher {
    shared: Arc<Shared>,
    sources: Arc<dyn SourceDirs>,
    stop: Mutex<Option<StopHandle>>,
}

impl Watcher {
    /// Create an idle watcher. The watch roots are read from `sources` on `start`.
    pub fn new(
        store: Arc<TrackStore>,
        paths: &IndexPaths,
        sources: Arc<dyn SourceDirs>,
        emitter: Arc<dyn EventEmitter>,
        debounce: Duration,
    ) -> WatchResult<Self> {
        let debouncer = {
            let store = Arc::clone(&store);
            let snapshot = paths.snapshot.clone();
            Debouncer::new(debounce, move || {
                if let Err(e) = store.persist(&snapshot) {
                    error!(path = %snapshot.display(), error = %e, "Failed to persist index");
                }
                let event =
                    IndexUpdatedEvent::new(UpdateReason::Watch, store.revision(), store.len());
                if let Err(e) = emitter.emit_index_updated(event) {
                    warn!(error = %e, "Failed to emit index update");
                }
            })?
        };

        Ok(Self {
            shared: Arc::new(Shared {
                store,
                covers: paths.covers.clone(),
                state: Mutex::new(WatcherState::Idle),
                subscription: Mutex::new(Subscription::default()),
                debouncer,
            }),
            sources,
            stop: Mutex::new(None),
        })
    }

    pub fn state(&self) -> WatcherState {
        *self.shared.state.lock()
    }

    /// Directories currently under a recursive watch
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.shared.subscription.lock().dirs.iter().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Subscribe to every configured root and spawn the event loop.
    ///
    /// A root that cannot be watched is logged and skipped.
    pub fn start(&self) -> WatchResult<StopHandle> {
        let mut state = self.shared.state.lock();
        match *state {
            WatcherState::Running => return Err(WatchError::AlreadyRunning),
            WatcherState::Closed => return Err(WatchError::Closed),
            WatcherState::Idle => {}
        }

        let (event_tx, event_rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;

        let roots = normalize_roots(&self.sources.source_dirs());
        let mut dirs = HashSet::new();
        for root in roots {
            match watcher.watch(&root, RecursiveMode::Recursive) {
                Ok(()) => {
                    debug!(path = %root.display(), "Watching root");
                    dirs.insert(root);
                }
                Err(e) => warn!(path = %root.display(), error = %e, "Failed to watch root"),
            }
        }
        let watched = dirs.len();
        *self.shared.subscription.lock() = Subscription {
            watcher: Some(watcher),
            dirs,
        };

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("penguin-watch".to_string())
            .spawn(move || shared.run(event_rx, stop_rx));
        if let Err(e) = spawned {
            self.shared.release();
            return Err(WatchError::Thread(e));
        }

        let handle = StopHandle::new(stop_tx);
        *self.stop.lock() = Some(handle.clone());
        *state = WatcherState::Running;
        info!(roots = watched, "Watcher started");
        Ok(handle)
    }

    /// Release the subscription and cancel any pending persist. Idempotent.
    ///
    /// Does not wait for the event loop thread to exit.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state == WatcherState::Closed {
                return;
            }
            *state = WatcherState::Closed;
        }

        if let Some(handle) = self.stop.lock().take() {
            handle.stop();
        }
        self.shared.release();
        self.shared.debouncer.cancel();
        info!("Watcher closed");
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn run(self: Arc<Self>, events: Receiver<notify::Result<Event>>, stop: Receiver<()>) {
        debug!("Watcher event loop started");
        loop {
            select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => {
                        // Stop wins over anything still queued
                        if !matches!(stop.try_recv(), Err(TryRecvError::Empty)) {
                            break;
                        }
                        self.handle_event(event);
                    }
                    Ok(Err(e)) => warn!(error = %e, "Watch error"),
                    Err(_) => break,
                },
            }
        }

        self.release();
        let mut state = self.state.lock();
        if *state == WatcherState::Running {
            *state = WatcherState::Idle;
        }
        debug!("Watcher event loop stopped");
    }

    /// Drop the notify subscription and forget watched directories
    fn release(&self) {
        let mut subscription = self.subscription.lock();
        subscription.watcher = None;
        subscription.dirs.clear();
    }

    fn handle_event(&self, event: Event) {
        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.on_created(path);
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => self.on_renamed(mode, &event.paths),
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.on_modified(path);
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.on_removed(path);
                }
            }
            _ => {}
        }
    }

    fn on_created(&self, path: &Path) {
        if path.is_dir() {
            self.watch_dir(path);
            // Files may land before the new watch is active
            for entry in WalkDir::new(path).follow_links(true).into_iter().flatten() {
                if entry.file_type().is_file() && is_audio_file(entry.path()) {
                    self.index_file(entry.path());
                }
            }
        } else if is_audio_file(path) {
            self.index_file(path);
        }
    }

    fn on_modified(&self, path: &Path) {
        if is_audio_file(path) && path.is_file() {
            self.index_file(path);
        }
    }

    fn on_removed(&self, path: &Path) {
        let key = canonical_path(path).to_string_lossy().into_owned();
        if is_audio_file(path) {
            if self.store.remove(&key).is_some() {
                debug!(path = %key, "Removed track");
                self.debouncer.touch();
            }
            return;
        }

        // Possibly a directory; its tracks go with it
        let removed = self.store.remove_under(Path::new(&key));
        if removed > 0 {
            debug!(path = %key, removed, "Removed tracks under directory");
            self.debouncer.touch();
        }
        self.reconcile_watches();
    }

    fn on_renamed(&self, mode: RenameMode, paths: &[PathBuf]) {
        match (mode, paths) {
            (RenameMode::From, [from, ..]) => self.on_removed(from),
            (RenameMode::To, [to, ..]) => self.on_created(to),
            (RenameMode::Both, [from, to, ..]) => {
                self.on_removed(from);
                self.on_created(to);
            }
            _ => {
                for path in paths {
                    if path.exists() {
                        self.on_created(path);
                    } else {
                        self.on_removed(path);
                    }
                }
            }
        }
    }

    fn index_file(&self, path: &Path) {
        match extract_track(path, &self.covers) {
            Ok(track) => {
                debug!(path = %track.path, "Indexed track");
                self.store.upsert(track);
                self.debouncer.touch();
            }
            // Usually the file vanished again before we got to it
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable file"),
        }
    }

    fn watch_dir(&self, dir: &Path) {
        let dir = canonical_path(dir);
        let mut subscription = self.subscription.lock();
        let Some(watcher) = subscription.watcher.as_mut() else {
            return;
        };
        match watcher.watch(&dir, RecursiveMode::Recursive) {
            Ok(()) => {
                debug!(path = %dir.display(), "Watching new directory");
                subscription.dirs.insert(dir);
            }
            Err(e) => warn!(path = %dir.display(), error = %e, "Failed to watch directory"),
        }
    }

    /// Unwatch directories that no longer exist
    fn reconcile_watches(&self) {
        let mut subscription = self.subscription.lock();
        let gone: Vec<PathBuf> = subscription
            .dirs
            .iter()
            .filter(|dir| !dir.is_dir())
            .cloned()
            .collect();

        for dir in gone {
            subscription.dirs.remove(&dir);
            if let Some(watcher) = subscription.watcher.as_mut() {
                // The OS usually drops the watch on its own
                if let Err(e) = watcher.unwatch(&dir) {
                    debug!(path = %dir.display(), error = %e, "Unwatch failed");
                }
            }
            debug!(path = %dir.display(), "Stopped watching removed directory");
        }
    }
}
