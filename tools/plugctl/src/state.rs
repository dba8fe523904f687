//! Persisted plugin state commands

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use plugin_model::{split_plugin_id, ConfigMap, PluginCategory};
use plugin_state::{CriticalPlugins, FilePersistence, PluginStatePersistence, RegistrySettings};

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// List persisted states and configs
    #[command(about = "List persisted plugin states and configs")]
    List {
        /// Node data directory (default: data_dir from settings)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Only show one category (auth, trace, datasource-dialect, ...)
        #[arg(long)]
        category: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_command(cmd: StateCommands, settings: &RegistrySettings) -> Result<()> {
    match cmd {
        StateCommands::List {
            data_dir,
            category,
            json,
        } => {
            let data_dir = data_dir.unwrap_or_else(|| settings.data_dir.clone());
            let category = category
                .as_deref()
                .map(str::parse::<PluginCategory>)
                .transpose()?;
            list(&data_dir, category, json)
        },
    }
}

/// One persisted plugin, merged from both documents
#[derive(Debug, PartialEq, Eq)]
struct Row {
    plugin_id: String,
    enabled: Option<bool>,
    config: Option<ConfigMap>,
}

fn collect_rows(
    persistence: &dyn PluginStatePersistence,
    category: Option<PluginCategory>,
) -> Result<Vec<Row>> {
    let states = persistence.load_all_states()?;
    let mut configs: BTreeMap<String, ConfigMap> = persistence.load_all_configs()?;

    let ids: BTreeSet<String> = states.keys().chain(configs.keys()).cloned().collect();
    let rows = ids
        .into_iter()
        .filter(|id| match category {
            Some(category) => {
                split_plugin_id(id).map(|(c, _)| c) == Some(category.as_str())
            },
            None => true,
        })
        .map(|id| Row {
            enabled: states.get(&id).copied(),
            config: configs.remove(&id),
            plugin_id: id,
        })
        .collect();
    Ok(rows)
}

fn list(data_dir: &Path, category: Option<PluginCategory>, json: bool) -> Result<()> {
    let persistence = FilePersistence::new(data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    let rows = collect_rows(&persistence, category)?;

    if json {
        let document: Vec<_> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "pluginId": row.plugin_id,
                    "enabled": row.enabled,
                    "config": row.config,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("  {}", "No persisted plugin data".dimmed());
        return Ok(());
    }

    let critical = CriticalPlugins::builtin();
    println!(
        "{}",
        format!("Persisted plugins in {}", persistence.dir().display()).bright_cyan()
    );
    for row in &rows {
        let state = match row.enabled {
            Some(true) => "enabled".green(),
            Some(false) => "disabled".red(),
            None => "default".dimmed(),
        };
        let marker = if critical.contains(&row.plugin_id) {
            " (critical)".yellow()
        } else {
            "".normal()
        };
        println!("  {:<40} {}{}", row.plugin_id, state, marker);

        if let Some(config) = &row.config {
            for (key, value) in config {
                println!("    {} = {}", key, value);
            }
        }
    }
    Ok(())
}
