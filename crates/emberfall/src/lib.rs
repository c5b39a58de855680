//! # Emberfall World Server - Main Entry Point
//!
//! Server shell around the `ember_world` simulation core: CLI parsing,
//! configuration loading, logging setup, world data, and application
//! lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! emberfall
//!
//! # Specify custom configuration and world data
//! emberfall --config production.toml --world data/europe.toml
//!
//! # Override specific settings
//! emberfall --shards 4 --log-level debug
//!
//! # JSON logging for production
//! emberfall --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created. The
//! same applies to the world data file.
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;
mod store;

pub use store::TomlWorldStore;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the Emberfall world server.
///
/// Handles the complete application lifecycle: CLI parsing, configuration,
/// logging initialization, world load, and graceful shutdown.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration first to get logging settings.
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    logging::setup_logging(&config.logging, args.json_logs)?;

    match Application::new(args).await {
        Ok(application) => application.run().await,
        Err(e) => {
            error!("❌ Failed to start server: {}", e);
            Err(e)
        }
    }
}
