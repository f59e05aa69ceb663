//! Account Ledger Library
//!
//! # Overview
//!
//! A balance-mutation engine: debits ("use") and reversals ("cancel") against
//! account balances, serialized per account by a lock manager and recorded,
//! successful or not, in an append-only transaction ledger.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, ledger records, replay operations and errors
//! - [`core`] - Business logic components:
//!   - [`core::lock`] - Per-account lock managers with bounded wait and hold
//!   - [`core::engine`] - `BalanceEngine` (use, cancel, query, history)
//!   - [`core::account_store`] / [`core::ledger`] - In-memory collaborators
//!   - [`core::replay`] - Replaying operation files against a seeded engine
//! - [`io`] - CSV input and output
//! - [`strategy`] - Sequential and per-account parallel replay
//! - [`cli`] - CLI arguments parsing and replay wiring
//! - [`telemetry`] - Logging initialization
//!
//! # Operations
//!
//! - **Use**: debit an active account owned by the requesting user, never
//!   below zero
//! - **Cancel**: record the cancellation of an earlier use, given its id,
//!   account and full amount, within the cancellation window
//! - **Query**: read a ledger record by transaction id

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod telemetry;
pub mod types;

pub use core::{BalanceEngine, EngineConfig, InMemoryAccountStore, InMemoryLedger, InMemoryLockManager};
pub use io::{write_accounts_csv, write_ledger_csv};
pub use types::{
    Account, AccountStatus, LedgerError, LockError, Operation, TransactionId, TransactionKind,
    TransactionRecord, TransactionResult, User, UserId,
};
