//! Music library scanner module.
//!
//! A full scan walks every configured root on the calling thread and feeds
//! audio paths through a bounded queue into a fixed-size worker pool. Each
//! worker extracts metadata and upserts the result into the shared store.
//! The snapshot is persisted once the queue drains.

pub mod artwork;
pub mod metadata;
pub mod scan;

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

pub use metadata::extract_track;
pub use scan::{normalize_roots, scan_dirs};

/// Default bounded queue size between the directory walk and the workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 2048;

/// Scanner error types
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist snapshot: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Scan cancelled")]
    Cancelled,
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Number of extraction workers; 0 means available parallelism
    pub concurrency: usize,
    /// Capacity of the path queue; the walk blocks when it is full
    pub queue_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ScanOptions {
    pub fn worker_count(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// Statistics from a completed scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Audio files found by the walk
    pub discovered: usize,
    /// Files extracted and upserted
    pub indexed: usize,
    /// Files that could not be opened
    pub errors: usize,
    /// Directory entries the walk could not read
    pub walk_errors: usize,
}

/// Cooperative cancellation flag shared between a scan and its requester
#[derive(Debug, Clone, Default)]
pub struct ScanToken(Arc<AtomicBool>);

impl ScanToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
