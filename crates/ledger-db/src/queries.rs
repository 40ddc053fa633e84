use chrono::Duration;
use ledger_types::{Acceptance, Transaction, User, UserSummary};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::models::{self, TransactionRow, format_timestamp, parse_timestamp};
use crate::{LedgerStore, Result};

const TRANSACTION_COLUMNS: &str =
    "id, timestamp, sender_id, receiver_id, amount, message, accepted";

impl LedgerStore {
    // -- Users --

    /// All users in insertion order, without balances.
    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, username FROM user ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        username: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Usernames are not unique; inserting a duplicate creates a second account.
    pub fn insert_user(&self, name: &str, username: &str, balance: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user (name, username, balance) VALUES (?1, ?2, ?3)",
                params![name, username, balance],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, username, balance, "Inserted user");
            Ok(id)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn delete_user_by_id(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM user WHERE id = ?1", [id])?;
            debug!(id, removed, "Deleted user");
            Ok(())
        })
    }

    // -- Transactions --

    pub fn insert_transaction(
        &self,
        sender_id: i64,
        receiver_id: i64,
        amount: i64,
        message: &str,
        accepted: Acceptance,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            insert_transaction_row(conn, sender_id, receiver_id, amount, message, accepted)
        })
    }

    /// Transactions where the user is sender or receiver, oldest first.
    pub fn get_transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions
                 WHERE sender_id = ?1 OR receiver_id = ?1
                 ORDER BY id"
            ))?;

            let rows = stmt
                .query_map([user_id], read_transaction_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Transaction::try_from).collect()
        })
    }

    pub fn get_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
                    [id],
                    read_transaction_row,
                )
                .optional()?;

            row.map(Transaction::try_from).transpose()
        })
    }

    /// Set the acceptance state and refresh the timestamp. Unknown ids are ignored.
    ///
    /// The read and the write share one IMMEDIATE transaction, so the timestamp
    /// never moves backwards when several handles update the same row.
    pub fn update_transaction(&self, id: i64, accepted: Acceptance) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let stored: Option<String> = tx
                .query_row("SELECT timestamp FROM transactions WHERE id = ?1", [id], |r| {
                    r.get(0)
                })
                .optional()?;

            let Some(stored) = stored else {
                debug!(id, "Update of unknown transaction ignored");
                return Ok(());
            };

            // The refreshed timestamp must move forward even if the clock hasn't.
            let previous = parse_timestamp(&stored)?;
            let mut now = models::now();
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }

            tx.execute(
                "UPDATE transactions SET timestamp = ?1, accepted = ?2 WHERE id = ?3",
                params![format_timestamp(now), accepted.as_flag(), id],
            )?;
            tx.commit()?;
            debug!(id, ?accepted, "Updated transaction");
            Ok(())
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, username, balance FROM user WHERE id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                    balance: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

pub(crate) fn insert_transaction_row(
    conn: &Connection,
    sender_id: i64,
    receiver_id: i64,
    amount: i64,
    message: &str,
    accepted: Acceptance,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (timestamp, sender_id, receiver_id, amount, message, accepted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            format_timestamp(models::now()),
            sender_id,
            receiver_id,
            amount,
            message,
            accepted.as_flag(),
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!(id, sender_id, receiver_id, amount, "Inserted transaction");
    Ok(id)
}

fn read_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        amount: row.get(4)?,
        message: row.get(5)?,
        accepted: row.get(6)?,
    })
}
