//! plugctl - Plugin State Operator Tool
//!
//! Offline inspection of what a node keeps on disk: snapshot archives
//! produced for log compaction and the persisted plugin states/configs.

mod snapshot;
mod state;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{init_logging, LogConfig};
use plugin_state::RegistrySettings;
use tracing::debug;

#[derive(Parser)]
#[command(name = "plugctl")]
#[command(about = "Plugin state snapshot and persistence tool")]
#[command(long_about = "Plugin state snapshot and persistence tool

Snapshots:
  snapshot verify   Check an archive against its recorded checksum
  snapshot dump     Print the states and configs held by an archive
  snapshot create   Build an archive from a node's persisted data

Persisted state:
  state list        Show persisted plugin states and configs

Examples:
  plugctl snapshot verify ./snapshot
  plugctl snapshot dump ./snapshot --json
  plugctl snapshot create --data-dir ./data ./snapshot
  plugctl state list --category auth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Registry settings file (YAML/TOML/JSON); PLUGIN_STATE_* env vars override it
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect, verify and create snapshot archives
    #[command(about = "Inspect, verify and create snapshot archives")]
    Snapshot {
        #[command(subcommand)]
        command: snapshot::SnapshotCommands,
    },

    /// Inspect persisted plugin data
    #[command(about = "Inspect persisted plugin states and configs")]
    State {
        #[command(subcommand)]
        command: state::StateCommands,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let level = if cli.verbose { "debug" } else { "warn" };
    let mut log_config = LogConfig::new("plugctl").with_level(level);
    log_config.ansi = !cli.no_color;
    init_logging(&log_config).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let settings = RegistrySettings::load(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("Failed to load settings from {}", path.display()),
            None => "Failed to load settings".to_string(),
        }
    })?;
    debug!("Using data directory {}", settings.data_dir.display());

    match cli.command {
        Commands::Snapshot { command } => snapshot::handle_command(command, &settings),
        Commands::State { command } => state::handle_command(command, &settings),
    }
}
