use thiserror::Error;

use crate::store::StoreError;
use crate::watcher::WatchError;

/// Top-level indexer error
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Initialization failed: {0}")]
    Init(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Watcher error: {0}")]
    Watch(#[from] WatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type IndexResult<T> = Result<T, IndexError>;
