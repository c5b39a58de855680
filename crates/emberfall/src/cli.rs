//! Command-line interface handling for the Emberfall world server.
//!
//! Argument parsing via `clap`, with every option doubling as an override of
//! the corresponding configuration-file setting.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the world data file
    pub world_data: Option<PathBuf>,
    /// Optional override for the shard count
    pub shards: Option<u16>,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    pub fn parse() -> Self {
        let matches = Command::new("Emberfall World Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Sharded world simulation server: mob agents, AoI tracking, targeted broadcast")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("world")
                    .short('w')
                    .long("world")
                    .value_name("FILE")
                    .help("World data file (zones, templates, NPCs)"),
            )
            .arg(
                Arg::new("shards")
                    .short('s')
                    .long("shards")
                    .value_name("COUNT")
                    .help("Number of parallel world shards")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .get_matches();

        Self {
            config_path: PathBuf::from(
                matches
                    .get_one::<String>("config")
                    .expect("Default config path should always be set"),
            ),
            world_data: matches.get_one::<String>("world").map(PathBuf::from),
            shards: matches.get_one::<u16>("shards").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}
