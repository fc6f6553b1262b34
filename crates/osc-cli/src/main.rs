//! 🚀 osc, the command line. Loads config, sets up logging, builds a client,
//! and hands the subcommand to [`commands::run`]. Like a receptionist with opinions. 🦆

mod commands;
mod progress;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "osc.toml";

/// 🔎 Poke an OpenSearch cluster from the terminal.
#[derive(Debug, Parser)]
#[command(name = "osc", version, about)]
pub struct Cli {
    /// TOML config file. Defaults to ./osc.toml when it exists, otherwise OSC_* env vars only.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 👋 Cluster name and version
    Info,
    /// 🩺 Cluster health
    Health,
    /// 🐱 Any _cat API as a table (aliases, indices, nodes, shards, ...)
    Cat {
        api: String,
        /// index, alias, node or repository, depending on the API
        target: Option<String>,
    },
    /// 🖥️ Nodes, their roles and versions
    Nodes,
    /// 🏓 Ping every configured node at once
    Ping,
    /// 📸 Snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommand,
    },
    /// 🛠️ Any request, e.g. `osc raw GET /_cluster/settings`
    Raw {
        method: String,
        path: String,
        /// JSON body, or NDJSON for _bulk and friends
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// 📋 Every snapshot in a repository
    List { repository: String },
    /// 📸 Take a snapshot
    Create {
        repository: String,
        snapshot: String,
        /// comma-separated index patterns (default: everything)
        #[arg(long)]
        indices: Option<String>,
        /// stay and watch the progress bar
        #[arg(long)]
        wait: bool,
    },
    /// ♻️ Restore a snapshot
    Restore {
        repository: String,
        snapshot: String,
        #[arg(long)]
        indices: Option<String>,
        #[arg(long)]
        rename_pattern: Option<String>,
        #[arg(long)]
        rename_replacement: Option<String>,
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 RUST_LOG=osc=debug for the play-by-play
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion, one layer of sadness at a time
        let mut smells_like_the_network = false;
        for cause in err.chain() {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("could not connect")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("failed over all nodes")
                || cause_str.contains("no nodes were available")
            {
                smells_like_the_network = true;
            }
        }

        if smells_like_the_network {
            error!(
                "🔧 hint: no node answered. Check `nodes` in your config (or OSC_NODES), \
                that the cluster is actually up (`docker ps`, `docker compose up -d`), \
                and whether it wants https and credentials. Even clusters need coffee sometimes. ☕"
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = match cli.config {
        Some(path) => {
            // -- 🔒 an explicit file that isn't there is a typo, not a default
            let exists = path
                .try_exists()
                .with_context(|| format!("💀 Couldn't check whether '{}' exists", path.display()))?;
            anyhow::ensure!(
                exists,
                "💀 Configuration file '{}' does not exist. Relative paths are relative to where you ran osc from.",
                path.display()
            );
            Some(path)
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    };

    let config = osc::load_config(config_file.as_deref())
        .context("💀 Couldn't load the client configuration, take a look at the file and the OSC_* variables")?;
    let client = osc::Client::from_config(&config).context("💀 Couldn't build a client from the configuration")?;

    commands::run(&client, cli.command).await
}
