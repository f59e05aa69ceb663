//! Collaborator traits consumed by the balance engine
//!
//! The engine only talks to account storage and the transaction ledger through
//! these traits, so persistence technology can be swapped without touching the
//! balance-mutation rules. In-memory implementations live in
//! [`crate::core::account_store`] and [`crate::core::ledger`].

use crate::types::{Account, LedgerError, TransactionRecord, User, UserId};

/// Account and user storage
pub trait AccountStore: Send + Sync {
    /// Look up an account by its number
    fn find_by_number(&self, number: &str) -> Result<Option<Account>, LedgerError>;

    /// Look up a user by id
    fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError>;

    /// Atomically add `delta` to the account balance and return the updated account
    ///
    /// Callers must hold the account's lock. Implementations reject a delta that
    /// would drive the balance below zero or overflow it.
    fn apply_delta(&self, number: &str, delta: i64) -> Result<Account, LedgerError>;
}

/// Append-only transaction ledger
pub trait TransactionLedger: Send + Sync {
    /// Append a record; the caller supplies a unique transaction id
    fn insert(&self, record: TransactionRecord) -> Result<TransactionRecord, LedgerError>;

    /// Look up a record by transaction id
    fn find_by_id(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, LedgerError>;

    /// All records for an account ordered by `transacted_at`
    fn history(&self, account_number: &str) -> Result<Vec<TransactionRecord>, LedgerError>;
}
