use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Users --

/// A user as it appears in listings. Balance is deliberately left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub balance: i64,
}

// -- Transactions --

/// Whether the receiver has confirmed a transaction.
///
/// Stored as a nullable boolean: NULL is pending, 1 accepted, 0 rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceptance {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl Acceptance {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Self::Pending,
            Some(true) => Self::Accepted,
            Some(false) => Self::Rejected,
        }
    }

    pub fn as_flag(self) -> Option<bool> {
        match self {
            Self::Pending => None,
            Self::Accepted => Some(true),
            Self::Rejected => Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    pub message: String,
    pub accepted: Acceptance,
}

/// A balance move between two accounts, recorded as a transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
    #[serde(default)]
    pub message: String,
}
