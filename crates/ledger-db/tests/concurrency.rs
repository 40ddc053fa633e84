//! Stress tests for concurrent transfers.
//!
//! Transfers run as IMMEDIATE transactions, so many threads hammering the
//! same sender must not lose updates, whether they share one handle or each
//! open their own handle on the same file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ledger_db::{LedgerStore, StoreOptions};
use ledger_types::Acceptance;

const THREADS: i64 = 8;
const TRANSFERS_PER_THREAD: i64 = 50;
const OPENING_BALANCE: i64 = 10_000;

fn fresh_db_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "ledger_db_concurrency_{}_{}.db",
        name,
        std::process::id()
    ));
    for suffix in ["", "-wal", "-shm"] {
        let _ = fs::remove_file(format!("{}{}", path.display(), suffix));
    }
    path
}

fn options() -> StoreOptions {
    StoreOptions {
        busy_timeout: Duration::from_secs(30),
        ..StoreOptions::default()
    }
}

fn seed(store: &LedgerStore) -> (i64, Vec<i64>) {
    let sender = store.insert_user("Sender", "sender", OPENING_BALANCE).unwrap();
    let receivers = (0..THREADS)
        .map(|i| {
            store
                .insert_user(&format!("R{i}"), &format!("r{i}"), 0)
                .unwrap()
        })
        .collect();
    (sender, receivers)
}

fn assert_no_lost_updates(store: &LedgerStore, sender: i64, receivers: &[i64]) {
    let moved = THREADS * TRANSFERS_PER_THREAD;
    let sender_balance = store.get_user_by_id(sender).unwrap().unwrap().balance;
    assert_eq!(sender_balance, OPENING_BALANCE - moved);

    let mut total = sender_balance;
    for &id in receivers {
        let balance = store.get_user_by_id(id).unwrap().unwrap().balance;
        assert_eq!(balance, TRANSFERS_PER_THREAD);
        total += balance;
    }
    assert_eq!(total, OPENING_BALANCE);
}

#[test]
fn shared_handle_transfers_are_serialized() {
    let path = fresh_db_path("shared");
    let store = Arc::new(LedgerStore::open(&path, options()).unwrap());
    let (sender, receivers) = seed(&store);

    let handles: Vec<_> = receivers
        .iter()
        .map(|&receiver| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..TRANSFERS_PER_THREAD {
                    store.transfer(sender, receiver, 1).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_no_lost_updates(&store, sender, &receivers);
}

#[test]
fn separate_handles_on_one_file_are_serialized() {
    let path = fresh_db_path("separate");
    let (sender, receivers) = {
        let store = LedgerStore::open(&path, options()).unwrap();
        seed(&store)
    };

    // Open every handle up front so only transfers contend for the lock.
    let stores: Vec<LedgerStore> = (0..THREADS)
        .map(|_| LedgerStore::open(&path, options()).unwrap())
        .collect();

    let handles: Vec<_> = stores
        .into_iter()
        .zip(receivers.clone())
        .map(|(store, receiver)| {
            thread::spawn(move || {
                for _ in 0..TRANSFERS_PER_THREAD {
                    store.transfer(sender, receiver, 1).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let store = LedgerStore::open(&path, options()).unwrap();
    assert_no_lost_updates(&store, sender, &receivers);
}

#[test]
fn concurrent_recorded_transfers_keep_history_consistent() {
    let path = fresh_db_path("recorded");
    let store = Arc::new(LedgerStore::open(&path, options()).unwrap());
    let (sender, receivers) = seed(&store);

    let handles: Vec<_> = receivers
        .iter()
        .map(|&receiver| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..TRANSFERS_PER_THREAD {
                    store
                        .record_transfer(&ledger_types::TransferRequest {
                            sender_id: sender,
                            receiver_id: receiver,
                            amount: 1,
                            message: format!("payment {n}"),
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_no_lost_updates(&store, sender, &receivers);

    let history = store.get_transactions_for_user(sender).unwrap();
    assert_eq!(history.len() as i64, THREADS * TRANSFERS_PER_THREAD);
    let sent: i64 = history.iter().map(|t| t.amount).sum();
    assert_eq!(sent, OPENING_BALANCE - store.get_user_by_id(sender).unwrap().unwrap().balance);
}

#[test]
fn acceptance_updates_from_many_handles_never_rewind_timestamp() {
    const UPDATES_PER_THREAD: usize = 40;

    let path = fresh_db_path("update_timestamp");
    let tx_id = {
        let store = LedgerStore::open(&path, options()).unwrap();
        store
            .insert_transaction(1, 2, 10, "rent", Acceptance::Pending)
            .unwrap()
    };

    let stores: Vec<LedgerStore> = (0..THREADS)
        .map(|_| LedgerStore::open(&path, options()).unwrap())
        .collect();

    let handles: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(n, store)| {
            thread::spawn(move || {
                let state = if n % 2 == 0 { Acceptance::Accepted } else { Acceptance::Rejected };
                let mut last_seen = None;
                for _ in 0..UPDATES_PER_THREAD {
                    store.update_transaction(tx_id, state).unwrap();
                    let seen = store.get_transaction_by_id(tx_id).unwrap().unwrap().timestamp;
                    if let Some(last) = last_seen {
                        assert!(seen > last, "timestamp went from {last} to {seen}");
                    }
                    last_seen = Some(seen);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
