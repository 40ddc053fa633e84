pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod transfer;

pub use error::{LedgerError, Result};
pub use transfer::{RecordedTransfer, TransferOutcome, TransferPolicy};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a call waits on another handle's write lock before failing.
    pub busy_timeout: Duration,
    pub transfer_policy: TransferPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            transfer_policy: TransferPolicy::default(),
        }
    }
}

/// Handle to the ledger database.
///
/// Open it once at startup and hand it (or an `Arc` of it) to every consumer.
/// Calls on one handle are serialized by the connection mutex.
pub struct LedgerStore {
    conn: Mutex<Connection>,
    options: StoreOptions,
}

impl LedgerStore {
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL so readers on other handles don't block the writer
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(options.busy_timeout)?;

        migrations::run(&conn)?;

        info!("Ledger database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            options,
        })
    }

    pub fn open_in_memory(options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            options,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        f(&mut conn)
    }
}
