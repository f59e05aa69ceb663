//! Thread-safe in-memory account store
//!
//! This module provides the `InMemoryAccountStore` struct, which implements the
//! [`AccountStore`] collaborator trait using concurrent data structures.
//!
//! # Design
//!
//! Accounts and users are kept in two `DashMap`s. `apply_delta` mutates the
//! balance while holding the DashMap entry lock, so a single delta is atomic.
//! Serializing the read-validate-mutate sequence across calls is the job of
//! the per-account lock held by the balance engine, not of this store.
//!
//! Seeding (`insert_account`, `insert_user`) exists for tests and the replay
//! CLI; account lifecycle management is handled elsewhere.

use dashmap::DashMap;

use crate::core::traits::AccountStore;
use crate::types::{Account, AccountNumber, LedgerError, User, UserId};

/// Thread-safe account and user storage
///
/// Multiple threads can safely access different accounts simultaneously, while
/// operations on the same DashMap entry are serialized.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    /// Accounts by account number
    accounts: DashMap<AccountNumber, Account>,

    /// Users by id
    users: DashMap<UserId, User>,
}

impl InMemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// Insert or replace an account
    pub fn insert_account(&self, account: Account) {
        self.accounts.insert(account.number.clone(), account);
    }

    /// Insert or replace a user
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Snapshot of all accounts sorted by account number
    ///
    /// The returned vector is a snapshot; accounts may change immediately after
    /// this method returns.
    pub fn get_all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        accounts
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_number(&self, number: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.accounts.get(number).map(|entry| entry.value().clone()))
    }

    fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    fn apply_delta(&self, number: &str, delta: i64) -> Result<Account, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| LedgerError::account_not_found(number))?;
        let account = entry.value_mut();

        let new_balance = account.balance.checked_add_signed(delta).ok_or_else(|| {
            if delta < 0 {
                LedgerError::arithmetic_underflow("apply_delta", number)
            } else {
                LedgerError::arithmetic_overflow("apply_delta", number)
            }
        })?;

        account.balance = new_balance;
        Ok(account.clone())
    }
}
