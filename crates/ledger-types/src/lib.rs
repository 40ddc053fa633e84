pub mod models;

pub use models::{Acceptance, Transaction, TransferRequest, User, UserSummary};
