//! penguin-indexd: keeps a local audio library index up to date until interrupted.

use penguin_core::EventEmitter;
use penguin_index::{IndexError, IndexResult, Indexer, Settings};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logs every emitted event
struct LogEmitter;

impl EventEmitter for LogEmitter {
    fn emit(&self, event: &str, payload: Option<serde_json::Value>) -> Result<(), String> {
        match payload {
            Some(payload) => info!(event, %payload, "Event"),
            None => info!(event, "Event"),
        }
        Ok(())
    }
}

fn load_settings() -> IndexResult<Settings> {
    let settings = Settings::load()?;
    settings.validate().map_err(IndexError::InvalidSettings)?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };

    let indexer = match Indexer::open(&settings, Arc::new(LogEmitter)) {
        Ok(indexer) => indexer,
        Err(e) => {
            error!(error = %e, "Failed to open index");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = indexer.start() {
        error!(error = %e, "Failed to start indexer");
        return ExitCode::FAILURE;
    }
    info!(
        index = %indexer.paths().base.display(),
        roots = indexer.source_dirs().len(),
        "penguin-indexd running"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down");
    match tokio::task::spawn_blocking(move || indexer.shutdown()).await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to persist final snapshot");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Shutdown task failed");
            ExitCode::FAILURE
        }
    }
}
