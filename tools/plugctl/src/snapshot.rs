//! Snapshot archive commands

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::*;
use plugin_model::RegistrySnapshot;
use plugin_state::snapshot::{self, CHECKSUM_KEY, SNAPSHOT_ARCHIVE};
use plugin_state::{
    DirectorySnapshotStore, FilePersistence, PluginStatePersistence, RegistrySettings,
    SnapshotReader,
};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Check an archive against its recorded checksum
    #[command(about = "Check a snapshot archive against its recorded checksum")]
    Verify {
        /// Snapshot directory
        dir: PathBuf,
    },

    /// Print the contents of an archive
    #[command(about = "Print the states and configs held by a snapshot")]
    Dump {
        /// Snapshot directory
        dir: PathBuf,

        /// Print the raw snapshot document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build an archive from persisted data
    #[command(about = "Build a snapshot archive from a node's persisted plugin data")]
    Create {
        /// Node data directory (default: data_dir from settings)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output snapshot directory
        dir: PathBuf,
    },
}

pub fn handle_command(cmd: SnapshotCommands, settings: &RegistrySettings) -> Result<()> {
    match cmd {
        SnapshotCommands::Verify { dir } => verify(&dir),
        SnapshotCommands::Dump { dir, json } => dump(&dir, json),
        SnapshotCommands::Create { data_dir, dir } => {
            let data_dir = data_dir.unwrap_or_else(|| settings.data_dir.clone());
            create(&data_dir, &dir)
        },
    }
}

/// Result of comparing an archive with its metadata
#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Match,
    Mismatch { expected: String, actual: String },
    Unverified { actual: String },
}

fn open_store(dir: &Path) -> Result<DirectorySnapshotStore> {
    if !dir.join(SNAPSHOT_ARCHIVE).exists() {
        bail!("No {} in {}", SNAPSHOT_ARCHIVE, dir.display());
    }
    DirectorySnapshotStore::open(dir)
        .with_context(|| format!("Failed to open snapshot directory {}", dir.display()))
}

fn check(store: &DirectorySnapshotStore) -> Result<Verdict> {
    let (_, sum) = snapshot::read_archive(&store.path().join(SNAPSHOT_ARCHIVE))?;
    let actual = snapshot::format_checksum(sum);

    let expected = store
        .file_meta(SNAPSHOT_ARCHIVE)
        .and_then(|meta| meta.get(CHECKSUM_KEY).map(str::to_string));

    Ok(match expected {
        Some(expected) if expected.eq_ignore_ascii_case(&actual) => Verdict::Match,
        Some(expected) => Verdict::Mismatch { expected, actual },
        None => Verdict::Unverified { actual },
    })
}

fn verify(dir: &Path) -> Result<()> {
    let store = open_store(dir)?;

    match check(&store)? {
        Verdict::Match => {
            println!(
                "  {} {} checksum OK",
                "✓".green(),
                SNAPSHOT_ARCHIVE.bright_cyan()
            );
            Ok(())
        },
        Verdict::Unverified { actual } => {
            println!(
                "  {} {} has no recorded checksum (actual {})",
                "!".yellow(),
                SNAPSHOT_ARCHIVE.bright_cyan(),
                actual
            );
            Ok(())
        },
        Verdict::Mismatch { expected, actual } => {
            println!(
                "  {} {} checksum mismatch: expected {}, actual {}",
                "✗".red(),
                SNAPSHOT_ARCHIVE.bright_cyan(),
                expected,
                actual
            );
            bail!("Snapshot in {} failed verification", dir.display())
        },
    }
}

fn dump(dir: &Path, json: bool) -> Result<()> {
    let store = open_store(dir)?;
    let snapshot = snapshot::read_snapshot(&store)
        .with_context(|| format!("Failed to read snapshot in {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &RegistrySnapshot) {
    println!("{}", "States".bright_cyan());
    match &snapshot.states {
        Some(states) if !states.is_empty() => {
            for (id, enabled) in states {
                let flag = if *enabled {
                    "enabled".green()
                } else {
                    "disabled".red()
                };
                println!("  {:<40} {}", id, flag);
            }
        },
        _ => println!("  {}", "(none)".dimmed()),
    }

    println!("{}", "Configs".bright_cyan());
    match &snapshot.configs {
        Some(configs) if !configs.is_empty() => {
            for (id, config) in configs {
                println!("  {}", id.bright_yellow());
                for (key, value) in config {
                    println!("    {} = {}", key, value);
                }
            }
        },
        _ => println!("  {}", "(none)".dimmed()),
    }
}

fn create(data_dir: &Path, dir: &Path) -> Result<()> {
    let persistence = FilePersistence::new(data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    let snapshot = RegistrySnapshot::new(
        persistence.load_all_states()?,
        persistence.load_all_configs()?,
    );

    let store = DirectorySnapshotStore::open(dir)
        .with_context(|| format!("Failed to open snapshot directory {}", dir.display()))?;
    if !snapshot::write_snapshot(&store, &snapshot)? {
        bail!("Failed to record snapshot metadata in {}", dir.display());
    }

    info!("Snapshot written to {}", dir.display());
    println!(
        "  {} {} state(s), {} config(s) → {}",
        "✓".green(),
        snapshot.state_count(),
        snapshot.config_count(),
        dir.join(SNAPSHOT_ARCHIVE).display()
    );
    Ok(())
}
