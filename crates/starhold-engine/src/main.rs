//! Engine binary for Starhold conquest rooms.
//!
//! This is the main entry point that wires together configuration,
//! the shared room registry, and the gateway HTTP server. Rooms are
//! created at runtime through the gateway API; each launched room
//! runs its own loop task inside this process.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `starhold-config.yaml`
//! 3. Validate cross-field constraints
//! 4. Create the shared room registry
//! 5. Serve the gateway until the process is terminated

mod error;

use std::path::Path;
use std::sync::Arc;

use starhold_core::config::EngineConfig;
use starhold_gateway::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the Starhold engine.
///
/// Initializes logging and configuration, then serves the gateway.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails
/// to bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("starhold-engine starting");

    // 2. Load configuration.
    let config = load_config()?;

    // 3. Validate cross-field constraints.
    config.validate()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        tick_interval_ms = config.simulation.tick_interval_ms,
        territory_count = config.map.territory_count,
        autonomous_players = config.ai.autonomous_players,
        "Configuration loaded"
    );

    // 4. Create the shared room registry.
    let state = Arc::new(AppState::new(config.clone()));
    info!("Room registry initialized");

    // 5. Serve the gateway until the process is terminated.
    starhold_gateway::start_server(&config.server, state)
        .await
        .map_err(EngineError::from)?;

    info!("starhold-engine shutdown complete");
    Ok(())
}

/// Load the engine configuration from `starhold-config.yaml`.
///
/// Looks for the config file relative to the current working
/// directory; defaults apply when the file is absent.
fn load_config() -> Result<EngineConfig, EngineError> {
    let config_path = Path::new("starhold-config.yaml");
    if config_path.exists() {
        let config = EngineConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
