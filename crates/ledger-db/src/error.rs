use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Any failure reported by SQLite: I/O, corruption, busy timeout, constraint.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema version {found} is newer than supported version {supported}")]
    Schema { found: i64, supported: i64 },

    /// Only raised when transfers run under `TransferPolicy::Strict`.
    #[error("no such user: {0}")]
    UnknownUser(i64),

    /// `i64::MIN` cannot be debited because its negation does not fit.
    #[error("transfer amount {0} is out of range")]
    InvalidAmount(i64),

    #[error("balance of user {0} would overflow")]
    BalanceOverflow(i64),

    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
