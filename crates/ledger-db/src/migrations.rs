use rusqlite::Connection;
use tracing::{debug, info};

use crate::{LedgerError, LedgerStore, Result};

/// Highest schema version this build knows how to read.
pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version > SCHEMA_VERSION {
        return Err(LedgerError::Schema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    create_user_table(conn)?;
    create_transactions_table(conn)?;

    if version < 1 {
        info!("Ledger DB: running migration v1 (initial schema)");
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    }

    Ok(())
}

pub fn create_user_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS user (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            username    TEXT NOT NULL,
            balance     INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

pub fn drop_user_table(conn: &Connection) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS user;")?;
    Ok(())
}

pub fn create_transactions_table(conn: &Connection) -> Result<()> {
    // No foreign keys: sender and receiver are not checked against `user`.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS transactions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   TEXT NOT NULL,
            sender_id   INTEGER NOT NULL,
            receiver_id INTEGER NOT NULL,
            amount      INTEGER NOT NULL,
            message     TEXT NOT NULL,
            accepted    BOOL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_sender
            ON transactions(sender_id);

        CREATE INDEX IF NOT EXISTS idx_transactions_receiver
            ON transactions(receiver_id);
        ",
    )?;
    Ok(())
}

pub fn drop_transactions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS transactions;")?;
    Ok(())
}

impl LedgerStore {
    // -- Schema --

    pub fn create_user_table(&self) -> Result<()> {
        self.with_conn(create_user_table)
    }

    pub fn drop_user_table(&self) -> Result<()> {
        self.with_conn(|conn| {
            drop_user_table(conn)?;
            debug!("Dropped user table");
            Ok(())
        })
    }

    pub fn create_transactions_table(&self) -> Result<()> {
        self.with_conn(create_transactions_table)
    }

    pub fn drop_transactions_table(&self) -> Result<()> {
        self.with_conn(|conn| {
            drop_transactions_table(conn)?;
            debug!("Dropped transactions table");
            Ok(())
        })
    }

    /// Drop both tables and recreate them empty.
    pub fn reset(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            drop_transactions_table(&tx)?;
            drop_user_table(&tx)?;
            create_user_table(&tx)?;
            create_transactions_table(&tx)?;
            tx.commit()?;
            info!("Ledger tables reset");
            Ok(())
        })
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let version = conn.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |r| r.get(0),
            )?;
            Ok(version)
        })
    }
}
