//! Main application logic and lifecycle management.
//!
//! The `Application` struct orchestrates server startup (configuration,
//! world store, simulation), waits for shutdown signals, and performs
//! graceful teardown with final statistics.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner, signals::setup_signal_handlers};
use crate::store::TomlWorldStore;
use ember_world::WorldSim;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// The running Emberfall server application.
pub struct Application {
    config: AppConfig,
    store: Arc<TomlWorldStore>,
    sim: Arc<WorldSim>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// 1. Load configuration from file (creating a default if missing)
    /// 2. Apply command-line overrides
    /// 3. Validate the merged configuration
    /// 4. Open the world store and build the simulation
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(world_data) = args.world_data {
            config.server.world_data = world_data.to_string_lossy().to_string();
        }
        if let Some(shards) = args.shards {
            config.server.shards = shards;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let store = Arc::new(TomlWorldStore::open(PathBuf::from(&config.server.world_data)).await?);
        let sim = WorldSim::new(config.simulation.clone(), config.server.shards).await;

        info!("🚀 Emberfall World Server '{}'", config.server.name);
        info!(
            "📂 Config: {} | World data: {}",
            args.config_path.display(),
            config.server.world_data
        );

        Ok(Self { config, store, sim })
    }

    /// Runs the application until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Emberfall World Server Application");

        let report = self.sim.load_world(self.store.as_ref()).await?;
        if report.zones_skipped > 0 {
            error!(
                "❌ {} zone(s) were skipped during world load - check world data",
                report.zones_skipped
            );
        }
        info!(
            "🌍 {} mobs live across {} shard(s)",
            report.mobs_spawned,
            self.config.server.shards
        );

        // Periodic health report.
        if self.config.server.stats_interval_secs > 0 {
            let sim = self.sim.clone();
            let interval = Duration::from_secs(self.config.server.stats_interval_secs);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if sim.shutdown_state().is_shutdown_initiated() {
                        break;
                    }
                    let stats = sim.bus().stats();
                    info!(
                        "📊 Sessions: {} | Bus published: {} | dispatched: {} | handler errors: {}",
                        sim.sessions().len(),
                        stats.published(),
                        stats.dispatched(),
                        stats.handler_errors()
                    );
                }
            });
        }

        // Block until SIGINT/SIGTERM.
        let _shutdown_state = setup_signal_handlers().await?;

        info!("🛑 Shutting down world simulation");
        self.sim.teardown().await;

        let stats = self.sim.bus().stats();
        info!("📊 Final Statistics:");
        info!("  - Events published: {}", stats.published());
        info!("  - Deliveries dispatched: {}", stats.dispatched());
        info!("  - Handler errors: {}", stats.handler_errors());
        info!("👋 Emberfall server shut down cleanly");
        Ok(())
    }
}
