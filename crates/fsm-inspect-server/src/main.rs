//! Inspector server binary.
//!
//! Hosts the producer socket, the view feed and the REST API on one port
//! and keeps serving until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `fsm-inspect.yaml` (or the path given as the
//!    first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the shared inspector state
//! 4. Serve until `Ctrl-C`

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use fsm_inspect_core::InspectorConfig;
use fsm_inspect_core::config::LoggingConfig;
use fsm_inspect_observer::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "fsm-inspect.yaml";

/// Application entry point for the inspector.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the server
/// cannot bind.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config_found = config_path.exists();
    let config = InspectorConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("fsm-inspect starting");
    if config_found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Shared state.
    let state = Arc::new(AppState::with_ingest(config.ingest));
    info!(
        max_frame_bytes = config.ingest.max_frame_bytes,
        "Inspector initialized"
    );

    // 4. Serve until Ctrl-C.
    let server_config = ServerConfig::from(&config.listen);
    start_server(&server_config, state, shutdown_signal()).await?;

    info!("fsm-inspect stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
