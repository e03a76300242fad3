//! Indexer orchestration.
//!
//! Owns the store, the configured roots, the watcher and the scan
//! coordinator, and is the only object an embedding application needs.

use crossbeam_channel::{Receiver, bounded};
use parking_lot::Mutex;
use penguin_core::{
    EventEmitter, IndexUpdatedEvent, SharedSourceDirs, SourceDirs, Track, UpdateReason,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::IndexPaths;
use crate::error::{IndexError, IndexResult};
use crate::scanner::{ScanError, ScanOptions, ScanToken, normalize_roots, scan_dirs};
use crate::settings::Settings;
use crate::store::TrackStore;
use crate::watcher::Watcher;

struct ActiveScan {
    id: u64,
    roots: Vec<PathBuf>,
    token: ScanToken,
    /// Disconnects once the scan thread is done
    done: Receiver<()>,
}

/// Runs at most one scan at a time.
///
/// A request over the running scan's roots is dropped; a request over
/// different roots cancels the running scan and waits for it before walking.
struct ScanCoordinator {
    store: Arc<TrackStore>,
    paths: IndexPaths,
    options: ScanOptions,
    emitter: Arc<dyn EventEmitter>,
    active: Mutex<Option<ActiveScan>>,
    next_id: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl ScanCoordinator {
    fn new(
        store: Arc<TrackStore>,
        paths: IndexPaths,
        options: ScanOptions,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            store,
            paths,
            options,
            emitter,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// Returns false when an identical scan is already running.
    ///
    /// With `prune`, tracks outside `roots` are dropped before the walk,
    /// once any superseded scan has stopped writing to the store.
    fn request(self: &Arc<Self>, roots: &[PathBuf], prune: bool) -> IndexResult<bool> {
        let roots = normalize_roots(roots);
        let mut active = self.active.lock();

        let previous = match active.take() {
            Some(scan) if scan.roots == roots => {
                debug!(id = scan.id, "Identical scan already running");
                // The running scan only writes tracks under these roots
                if prune {
                    self.prune(&roots);
                }
                *active = Some(scan);
                return Ok(false);
            }
            Some(scan) => {
                info!(id = scan.id, "Superseding running scan");
                scan.token.cancel();
                Some(scan)
            }
            None => None,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = ScanToken::new();
        let (done_tx, done) = bounded::<()>(0);
        let coordinator = Arc::clone(self);
        let scan_roots = roots.clone();
        let scan_token = token.clone();
        let previous_done = previous.as_ref().map(|scan| scan.done.clone());
        let spawned = thread::Builder::new()
            .name(format!("penguin-scan-request-{id}"))
            .spawn(move || {
                if let Some(previous_done) = previous_done {
                    let _ = previous_done.recv();
                }
                if prune {
                    coordinator.prune(&scan_roots);
                }
                coordinator.run(id, &scan_roots, &scan_token);
                drop(done_tx);
            });

        if let Err(e) = spawned {
            *active = previous;
            return Err(e.into());
        }

        *active = Some(ActiveScan {
            id,
            roots,
            token,
            done,
        });
        Ok(true)
    }

    fn run(&self, id: u64, roots: &[PathBuf], token: &ScanToken) {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        match scan_dirs(roots, &self.store, &self.paths, &self.options, token) {
            Ok(_) => {
                let event =
                    IndexUpdatedEvent::new(UpdateReason::Scan, self.store.revision(), self.store.len());
                if let Err(e) = self.emitter.emit_index_updated(event) {
                    warn!(error = %e, "Failed to emit index update");
                }
            }
            Err(ScanError::Cancelled) => debug!(id, "Scan cancelled"),
            Err(e) => error!(id, error = %e, "Scan failed"),
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|scan| scan.id == id) {
            *active = None;
        }
    }

    /// Drop tracks outside `roots` and persist the result
    fn prune(&self, roots: &[PathBuf]) {
        let removed = self.store.retain_under(roots);
        if removed == 0 {
            return;
        }
        info!(removed, "Removed tracks outside the library roots");
        if let Err(e) = self.store.persist(&self.paths.snapshot) {
            warn!(error = %e, "Failed to persist index after pruning");
        }
    }

    fn cancel(&self) {
        if let Some(scan) = self.active.lock().as_ref() {
            scan.token.cancel();
        }
    }

    /// Block until no scan is running or queued
    fn wait(&self) {
        loop {
            let done = self.active.lock().as_ref().map(|scan| scan.done.clone());
            match done {
                Some(done) => {
                    let _ = done.recv();
                }
                None => break,
            }
        }
    }

    fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Most scans ever inside `run` at once
    #[cfg(test)]
    fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

pub struct Indexer {
    store: Arc<TrackStore>,
    paths: IndexPaths,
    sources: Arc<SharedSourceDirs>,
    emitter: Arc<dyn EventEmitter>,
    scans: Arc<ScanCoordinator>,
    watcher: Mutex<Option<Watcher>>,
    debounce: Duration,
    shut_down: AtomicBool,
}

impl Indexer {
    /// Create the index directory and load the existing snapshot.
    pub fn open(settings: &Settings, emitter: Arc<dyn EventEmitter>) -> IndexResult<Self> {
        settings.validate().map_err(IndexError::InvalidSettings)?;

        let paths = settings.index_paths();
        paths.create_dirs()?;

        let store = Arc::new(TrackStore::new());
        store.load(&paths.snapshot)?;
        info!(path = %paths.snapshot.display(), tracks = store.len(), "Opened index");

        let scans = Arc::new(ScanCoordinator::new(
            Arc::clone(&store),
            paths.clone(),
            settings.scan_options(),
            Arc::clone(&emitter),
        ));

        Ok(Self {
            store,
            paths,
            sources: Arc::new(SharedSourceDirs::new(settings.library.source_dirs.clone())),
            emitter,
            scans,
            watcher: Mutex::new(None),
            debounce: settings.debounce(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Start watching, announce the loaded snapshot, and scan in the background.
    pub fn start(&self) -> IndexResult<()> {
        self.ensure_open()?;
        self.restart_watcher()?;

        let event = IndexUpdatedEvent::new(
            UpdateReason::Startup,
            self.store.revision(),
            self.store.len(),
        );
        if let Err(e) = self.emitter.emit_index_updated(event) {
            warn!(error = %e, "Failed to emit index update");
        }

        self.rescan()?;
        Ok(())
    }

    /// Scan the configured roots. Returns false if an identical scan is already running.
    pub fn rescan(&self) -> IndexResult<bool> {
        self.ensure_open()?;
        self.scans.request(&self.sources.source_dirs(), false)
    }

    /// Replace the configured roots, rescan, and re-watch if the watcher is running.
    ///
    /// Tracks no longer under any root are removed from the index.
    pub fn set_source_dirs(&self, dirs: Vec<PathBuf>) -> IndexResult<()> {
        self.ensure_open()?;
        if !self.sources.set(dirs) {
            debug!("Source directories unchanged");
            return Ok(());
        }
        self.sources_changed()
    }

    /// Add one root. Does nothing if it is already configured.
    pub fn add_source_dir(&self, dir: PathBuf) -> IndexResult<()> {
        self.ensure_open()?;
        if !self.sources.add(dir) {
            debug!("Source directory already configured");
            return Ok(());
        }
        self.sources_changed()
    }

    /// Remove one root and its tracks. Does nothing if it is not configured.
    pub fn remove_source_dir(&self, dir: &Path) -> IndexResult<()> {
        self.ensure_open()?;
        if !self.sources.remove(dir) {
            debug!(dir = %dir.display(), "Source directory not configured");
            return Ok(());
        }
        self.sources_changed()
    }

    pub fn source_dirs(&self) -> Vec<PathBuf> {
        self.sources.source_dirs()
    }

    /// Current tracks, in no particular order
    pub fn tracks(&self) -> Vec<Track> {
        self.store.tracks()
    }

    pub fn store(&self) -> &Arc<TrackStore> {
        &self.store
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn is_scanning(&self) -> bool {
        self.scans.is_running()
    }

    /// Block until the running scan, if any, has finished
    pub fn wait_for_scan(&self) {
        self.scans.wait();
    }

    /// Cancel scans, close the watcher and write a final snapshot. Idempotent.
    pub fn shutdown(&self) -> IndexResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.scans.cancel();
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.close();
        }
        self.scans.wait();

        self.store.persist(&self.paths.snapshot)?;
        info!(tracks = self.store.len(), "Indexer shut down");
        Ok(())
    }

    fn sources_changed(&self) -> IndexResult<()> {
        let roots = self.sources.source_dirs();
        info!(roots = roots.len(), "Source directories changed");

        self.scans.request(&roots, true)?;
        if self.watcher.lock().is_some() {
            self.restart_watcher()?;
        }
        Ok(())
    }

    fn restart_watcher(&self) -> IndexResult<()> {
        let mut slot = self.watcher.lock();
        if let Some(old) = slot.take() {
            old.close();
        }

        let sources: Arc<dyn SourceDirs> = self.sources.clone();
        let watcher = Watcher::new(
            Arc::clone(&self.store),
            &self.paths,
            sources,
            Arc::clone(&self.emitter),
            self.debounce,
        )?;
        watcher.start()?;
        *slot = Some(watcher);
        Ok(())
    }

    fn ensure_open(&self) -> IndexResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(IndexError::Init(std::io::Error::other("indexer is shut down")));
        }
        Ok(())
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "Failed to shut down indexer");
        }
    }
}
