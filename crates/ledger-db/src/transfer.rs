use ledger_types::{Acceptance, TransferRequest};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, warn};

use crate::queries::{insert_transaction_row, query_user_by_id};
use crate::{LedgerError, LedgerStore, Result};

/// What a transfer does when an account id has no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPolicy {
    /// A missing balance reads as 0 and its update touches no row.
    /// The counterparty still moves by the full amount.
    #[default]
    Lenient,
    /// Unknown sender or receiver fails the whole transfer.
    Strict,
}

/// Balances after a transfer. `None` marks an account with no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub sender_balance: Option<i64>,
    pub receiver_balance: Option<i64>,
}

/// A committed transfer together with the transaction row that records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub transaction_id: i64,
    pub outcome: TransferOutcome,
}

impl LedgerStore {
    /// Move `amount` from sender to receiver as a single SQLite transaction.
    ///
    /// The write lock is taken up front, so concurrent transfers through any
    /// handle on the same file are serialized. Amounts and resulting balances
    /// may be negative; no domain validation happens here.
    pub fn transfer(&self, sender_id: i64, receiver_id: i64, amount: i64) -> Result<TransferOutcome> {
        let policy = self.options().transfer_policy;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let outcome = apply_transfer(&tx, policy, sender_id, receiver_id, amount)?;
            tx.commit()?;

            info!(sender_id, receiver_id, amount, "Transfer committed");
            Ok(outcome)
        })
    }

    /// Transfer and record it as an accepted transaction in one unit.
    /// The returned balances are the ones written inside that unit.
    pub fn record_transfer(&self, req: &TransferRequest) -> Result<RecordedTransfer> {
        let policy = self.options().transfer_policy;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let outcome = apply_transfer(&tx, policy, req.sender_id, req.receiver_id, req.amount)?;
            let id = insert_transaction_row(
                &tx,
                req.sender_id,
                req.receiver_id,
                req.amount,
                &req.message,
                Acceptance::Accepted,
            )?;
            tx.commit()?;

            info!(
                transaction_id = id,
                sender_id = req.sender_id,
                receiver_id = req.receiver_id,
                amount = req.amount,
                "Recorded transfer"
            );
            Ok(RecordedTransfer {
                transaction_id: id,
                outcome,
            })
        })
    }
}

fn apply_transfer(
    conn: &Connection,
    policy: TransferPolicy,
    sender_id: i64,
    receiver_id: i64,
    amount: i64,
) -> Result<TransferOutcome> {
    if policy == TransferPolicy::Strict {
        for id in [sender_id, receiver_id] {
            if query_user_by_id(conn, id)?.is_none() {
                return Err(LedgerError::UnknownUser(id));
            }
        }
    }

    let debit = amount
        .checked_neg()
        .ok_or(LedgerError::InvalidAmount(amount))?;

    // Sender first, then receiver: a self-transfer nets out on the same row.
    let sender_balance = adjust_balance(conn, sender_id, debit)?;
    let receiver_balance = adjust_balance(conn, receiver_id, amount)?;

    Ok(TransferOutcome {
        sender_balance,
        receiver_balance,
    })
}

fn adjust_balance(conn: &Connection, id: i64, delta: i64) -> Result<Option<i64>> {
    let current: Option<i64> = conn
        .query_row("SELECT balance FROM user WHERE id = ?1", [id], |r| r.get(0))
        .optional()?;

    if current.is_none() {
        warn!(id, delta, "Transfer touches unknown user; balance read as 0");
    }

    let updated = current
        .unwrap_or(0)
        .checked_add(delta)
        .ok_or(LedgerError::BalanceOverflow(id))?;

    conn.execute(
        "UPDATE user SET balance = ?1 WHERE id = ?2",
        params![updated, id],
    )?;
    debug!(id, updated, "Balance adjusted");

    Ok(current.map(|_| updated))
}
