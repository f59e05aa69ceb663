//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account and user types
//! - `transaction`: Ledger records and identifiers
//! - `operation`: Replay operations read from input files
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod operation;
pub mod transaction;

pub use account::{Account, AccountNumber, AccountStatus, User, UserId};
pub use error::{ErrorCategory, LedgerError, LockError};
pub use operation::Operation;
pub use transaction::{
    new_transaction_id, TransactionId, TransactionKind, TransactionRecord, TransactionResult,
};
