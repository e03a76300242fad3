//! Full library scan: directory walk feeding a bounded worker pool.

use crossbeam_channel::bounded;
use penguin_core::is_audio_file;
use penguin_core::track::canonical_path;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::IndexPaths;
use crate::scanner::metadata::extract_track;
use crate::scanner::{ScanError, ScanOptions, ScanResult, ScanStats, ScanToken};
use crate::store::TrackStore;

#[derive(Default)]
struct Counters {
    discovered: AtomicUsize,
    indexed: AtomicUsize,
    errors: AtomicUsize,
    walk_errors: AtomicUsize,
}

impl Counters {
    fn stats(&self) -> ScanStats {
        ScanStats {
            discovered: self.discovered.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            walk_errors: self.walk_errors.load(Ordering::Relaxed),
        }
    }
}

/// Canonical, sorted, de-duplicated roots with nested roots removed.
///
/// Roots are keyed the same way the watcher keys notification paths.
pub fn normalize_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut resolved: Vec<PathBuf> = roots.iter().map(|root| canonical_path(root)).collect();
    resolved.sort();
    resolved.dedup();

    let mut kept: Vec<PathBuf> = Vec::with_capacity(resolved.len());
    for root in resolved {
        if !kept.iter().any(|parent| root.starts_with(parent)) {
            kept.push(root);
        }
    }
    kept
}

/// Re-index every audio file under `roots` into `store`, then persist a snapshot.
///
/// Unreadable files and directory entries are skipped. The scan fails only if
/// the worker pool cannot be built, the final persist fails, or `token` is
/// cancelled, in which case nothing is persisted.
pub fn scan_dirs(
    roots: &[PathBuf],
    store: &TrackStore,
    paths: &IndexPaths,
    options: &ScanOptions,
    token: &ScanToken,
) -> ScanResult<ScanStats> {
    let roots = normalize_roots(roots);
    let workers = options.worker_count();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("penguin-scan-{i}"))
        .build()?;

    info!(roots = roots.len(), workers, "Starting library scan");

    let counters = Counters::default();
    let (tx, rx) = bounded::<PathBuf>(options.queue_capacity.max(1));

    // The walk runs on this thread so a full queue never starves the pool
    pool.in_place_scope(|scope| {
        let counters = &counters;
        for _ in 0..workers {
            let rx = rx.clone();
            scope.spawn(move |_| {
                for path in rx.iter() {
                    if token.is_cancelled() {
                        break;
                    }
                    match extract_track(&path, &paths.covers) {
                        Ok(track) => {
                            store.upsert(track);
                            counters.indexed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                            counters.errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
        drop(rx);

        walk_roots(&roots, tx, token, counters);
    });

    let stats = counters.stats();
    if token.is_cancelled() {
        info!(indexed = stats.indexed, "Library scan cancelled");
        return Err(ScanError::Cancelled);
    }

    store.persist(&paths.snapshot)?;
    info!(
        discovered = stats.discovered,
        indexed = stats.indexed,
        errors = stats.errors,
        walk_errors = stats.walk_errors,
        tracks = store.len(),
        "Library scan complete"
    );
    Ok(stats)
}

/// Feed audio paths into the queue. Dropping `tx` on return lets workers drain and exit.
fn walk_roots(
    roots: &[PathBuf],
    tx: crossbeam_channel::Sender<PathBuf>,
    token: &ScanToken,
    counters: &Counters,
) {
    for root in roots {
        for entry in WalkDir::new(root).follow_links(true) {
            if token.is_cancelled() {
                return;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    counters.walk_errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };
            if entry.file_type().is_dir() || !is_audio_file(entry.path()) {
                continue;
            }

            counters.discovered.fetch_add(1, Ordering::Relaxed);
            if tx.send(entry.into_path()).is_err() {
                // All workers gone
                return;
            }
        }
    }
}
