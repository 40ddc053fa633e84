use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ledger_db::{StoreOptions, TransferPolicy};

pub const DEFAULT_DB_PATH: &str = "ledger.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub store: StoreOptions,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("LEDGER_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.into())
            .into();

        let busy_timeout_ms: u64 = match lookup("LEDGER_BUSY_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("LEDGER_BUSY_TIMEOUT_MS is not a number: {raw:?}"))?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        let transfer_policy = if lookup("LEDGER_STRICT_TRANSFERS").is_some_and(|v| is_truthy(&v)) {
            TransferPolicy::Strict
        } else {
            TransferPolicy::Lenient
        };

        Ok(Self {
            db_path,
            store: StoreOptions {
                busy_timeout: Duration::from_millis(busy_timeout_ms),
                transfer_policy,
            },
        })
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
