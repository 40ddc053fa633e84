//! Database row types — these map directly to SQLite rows.
//! Converted into ledger-types models once the text columns are decoded.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use ledger_types::{Acceptance, Transaction};

use crate::{LedgerError, Result};

pub struct TransactionRow {
    pub id: i64,
    pub timestamp: String,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    pub message: String,
    pub accepted: Option<bool>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Transaction {
            id: row.id,
            timestamp: parse_timestamp(&row.timestamp)?,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            amount: row.amount,
            message: row.message,
            accepted: Acceptance::from_flag(row.accepted),
        })
    }
}

/// Current time at the precision the database keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamps are stored as RFC 3339 UTC with microseconds, which sorts lexically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Layout of rows written before timestamps carried an offset, read as UTC.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .map(|ts| ts.and_utc())
        .map_err(|_| LedgerError::InvalidTimestamp(raw.to_string()))
}
