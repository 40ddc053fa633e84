mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use ledger_db::{LedgerStore, TransferPolicy};

use crate::commands::Command;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "ledger", version, about = "Operate on the payment ledger database", propagate_version = true)]
struct Cli {
    /// Database file (overrides LEDGER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reject transfers naming unknown users (overrides LEDGER_STRICT_TRANSFERS)
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger=info,ledger_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if cli.strict {
        config.store.transfer_policy = TransferPolicy::Strict;
    }
    debug!(?config, "Loaded configuration");

    let store = LedgerStore::open(&config.db_path, config.store)
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    let mut stdout = std::io::stdout().lock();
    commands::run(&store, cli.command, &mut stdout)
}
