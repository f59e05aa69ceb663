//! Core business logic module
//!
//! This module contains the balance-mutation components:
//! - `traits` - Collaborator traits for account storage and the ledger
//! - `account_store` - In-memory account and user storage
//! - `ledger` - In-memory append-only transaction ledger
//! - `lock` - Per-account lock managers and scoped acquisition
//! - `config` - Engine configuration
//! - `engine` - Balance usage and cancellation orchestration
//! - `replay` - Replaying recorded operations against a seeded engine

pub mod account_store;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod lock;
pub mod replay;
pub mod traits;

pub use account_store::InMemoryAccountStore;
pub use config::EngineConfig;
pub use engine::BalanceEngine;
pub use ledger::InMemoryLedger;
pub use lock::{with_lease, with_lock, InMemoryLockManager, LockGuard, LockHandle, LockManager};
pub use replay::{ProcessingResult, Replayer};
pub use traits::{AccountStore, TransactionLedger};
