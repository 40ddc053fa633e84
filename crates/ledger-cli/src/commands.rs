use std::io::Write;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use ledger_db::LedgerStore;
use ledger_types::{Acceptance, TransferRequest};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database file and schema if missing
    Init,
    /// Drop and recreate both tables (destroys all data)
    Reset,
    /// Manage user accounts
    #[command(subcommand)]
    Users(UserCommand),
    /// Manage payment transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Move balance from one user to another
    Transfer(TransferArgs),
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List all users (without balances)
    List,
    /// Add a user with an opening balance
    Add {
        name: String,
        username: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        balance: i64,
    },
    /// Show one user including balance
    Show { id: i64 },
    /// Delete a user; deleting a missing id succeeds
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum TxCommand {
    /// Record a transaction without touching balances
    Add(AddTx),
    /// Show one transaction
    Show { id: i64 },
    /// List transactions a user sent or received
    List {
        #[arg(long)]
        user: i64,
    },
    /// Mark a transaction accepted
    Accept { id: i64 },
    /// Mark a transaction rejected
    Reject { id: i64 },
    /// Return a transaction to pending
    Pending { id: i64 },
}

#[derive(Debug, Args)]
pub struct AddTx {
    #[arg(long)]
    from: i64,
    #[arg(long)]
    to: i64,
    #[arg(long, allow_negative_numbers = true)]
    amount: i64,
    #[arg(long, default_value = "")]
    message: String,
    #[arg(long, value_enum, default_value_t = State::Pending)]
    state: State,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    #[arg(long)]
    from: i64,
    #[arg(long)]
    to: i64,
    #[arg(long, allow_negative_numbers = true)]
    amount: i64,
    /// Also record the transfer as an accepted transaction
    #[arg(long)]
    record: bool,
    #[arg(long, default_value = "")]
    message: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum State {
    Pending,
    Accepted,
    Rejected,
}

impl From<State> for Acceptance {
    fn from(state: State) -> Self {
        match state {
            State::Pending => Acceptance::Pending,
            State::Accepted => Acceptance::Accepted,
            State::Rejected => Acceptance::Rejected,
        }
    }
}

#[derive(Serialize)]
struct Created {
    id: i64,
}

#[derive(Serialize)]
struct TransferReport {
    sender_balance: Option<i64>,
    receiver_balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<i64>,
}

pub fn run<W: Write>(store: &LedgerStore, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Init => {
            let version = store.schema_version()?;
            info!(version, "Ledger schema ready");
            emit(out, &serde_json::json!({ "schema_version": version }))
        }
        Command::Reset => {
            store.reset()?;
            emit(out, &serde_json::json!({ "reset": true }))
        }
        Command::Users(cmd) => run_users(store, cmd, out),
        Command::Tx(cmd) => run_tx(store, cmd, out),
        Command::Transfer(args) => run_transfer(store, args, out),
    }
}

fn run_users<W: Write>(store: &LedgerStore, cmd: UserCommand, out: &mut W) -> Result<()> {
    match cmd {
        UserCommand::List => emit(out, &store.list_users()?),
        UserCommand::Add {
            name,
            username,
            balance,
        } => {
            let id = store.insert_user(&name, &username, balance)?;
            emit(out, &Created { id })
        }
        UserCommand::Show { id } => {
            let user = store
                .get_user_by_id(id)?
                .ok_or_else(|| anyhow!("no user with id {id}"))?;
            emit(out, &user)
        }
        UserCommand::Delete { id } => {
            store.delete_user_by_id(id)?;
            emit(out, &serde_json::json!({ "deleted": id }))
        }
    }
}

fn run_tx<W: Write>(store: &LedgerStore, cmd: TxCommand, out: &mut W) -> Result<()> {
    let set_state = |id: i64, state: Acceptance, out: &mut W| -> Result<()> {
        store.update_transaction(id, state)?;
        let tx = store
            .get_transaction_by_id(id)?
            .ok_or_else(|| anyhow!("no transaction with id {id}"))?;
        emit(out, &tx)
    };

    match cmd {
        TxCommand::Add(add) => {
            let id = store.insert_transaction(
                add.from,
                add.to,
                add.amount,
                &add.message,
                add.state.into(),
            )?;
            emit(out, &Created { id })
        }
        TxCommand::Show { id } => {
            let tx = store
                .get_transaction_by_id(id)?
                .ok_or_else(|| anyhow!("no transaction with id {id}"))?;
            emit(out, &tx)
        }
        TxCommand::List { user } => emit(out, &store.get_transactions_for_user(user)?),
        TxCommand::Accept { id } => set_state(id, Acceptance::Accepted, out),
        TxCommand::Reject { id } => set_state(id, Acceptance::Rejected, out),
        TxCommand::Pending { id } => set_state(id, Acceptance::Pending, out),
    }
}

fn run_transfer<W: Write>(store: &LedgerStore, args: TransferArgs, out: &mut W) -> Result<()> {
    let report = if args.record {
        let recorded = store.record_transfer(&TransferRequest {
            sender_id: args.from,
            receiver_id: args.to,
            amount: args.amount,
            message: args.message,
        })?;
        TransferReport {
            sender_balance: recorded.outcome.sender_balance,
            receiver_balance: recorded.outcome.receiver_balance,
            transaction_id: Some(recorded.transaction_id),
        }
    } else {
        let outcome = store.transfer(args.from, args.to, args.amount)?;
        TransferReport {
            sender_balance: outcome.sender_balance,
            receiver_balance: outcome.receiver_balance,
            transaction_id: None,
        }
    };

    emit(out, &report)
}

fn emit<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
