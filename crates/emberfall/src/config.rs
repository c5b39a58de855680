//! Configuration management for the Emberfall world server.
//!
//! Loads, validates, and converts server configuration from TOML files and
//! command-line arguments.

use ember_world::SimConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_shards() -> u16 {
    1
}

fn default_world_data() -> String {
    "data/world.toml".to_string()
}

fn default_stats_interval_secs() -> u64 {
    60
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Simulation tuning parameters
    #[serde(default)]
    pub simulation: SimConfig,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Display name of this server process
    pub name: String,
    /// Number of parallel world shards this process simulates
    #[serde(default = "default_shards")]
    pub shards: u16,
    /// Path to the world data file (zones, templates, NPCs)
    #[serde(default = "default_world_data")]
    pub world_data: String,
    /// Interval between statistics reports in seconds (0 to disable)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

/// Logging system configuration.
///
/// Controls log output format, levels, and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                name: "emberfall-1".to_string(),
                shards: default_shards(),
                world_data: default_world_data(),
                stats_interval_secs: default_stats_interval_secs(),
            },
            simulation: SimConfig::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.name.is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        if self.server.shards == 0 {
            return Err("Shard count must be at least 1".to_string());
        }
        if self.server.world_data.is_empty() {
            return Err("World data path cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        self.simulation.validate()
    }
}
