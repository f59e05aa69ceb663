//! Account-related types for the account ledger
//!
//! This module defines the Account and User structures owned by the account
//! store collaborator and referenced by the balance engine.

use serde::{Deserialize, Serialize};

/// Account number
///
/// Opaque identifier; also the key used to scope per-account locking.
pub type AccountNumber = String;

/// User identifier
pub type UserId = u64;

/// Account lifecycle status
///
/// Only `Active` accounts accept balance usage. Opening and closing accounts
/// is handled outside of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// The account is open and may be debited
    Active,

    /// The account has been closed; usage is rejected
    Closed,
}

/// Account state
///
/// The balance is expressed in the smallest currency unit and can never be
/// negative. It may only be mutated by a caller that currently holds the
/// account's lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account number
    pub number: AccountNumber,

    /// The user that owns this account
    pub owner: UserId,

    /// Whether the account is active or closed
    pub status: AccountStatus,

    /// Current balance in the smallest currency unit
    pub balance: u64,
}

impl Account {
    /// Create a new active account with the given opening balance
    pub fn new(number: impl Into<AccountNumber>, owner: UserId, balance: u64) -> Self {
        Account {
            number: number.into(),
            owner,
            status: AccountStatus::Active,
            balance,
        }
    }

    /// Whether the account accepts balance usage
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// A user that may own accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user id
    pub id: UserId,

    /// Display name
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        User {
            id,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_active() {
        let account = Account::new("1000000000", 1, 10_000);

        assert_eq!(account.number, "1000000000");
        assert_eq!(account.owner, 1);
        assert_eq!(account.balance, 10_000);
        assert!(account.is_active());
    }

    #[test]
    fn test_closed_account_is_not_active() {
        let mut account = Account::new("1000000000", 1, 0);
        account.status = AccountStatus::Closed;

        assert!(!account.is_active());
    }
}
