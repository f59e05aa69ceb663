//! Transaction-related types for the account ledger
//!
//! This module defines the immutable ledger record written for every use and
//! cancel attempt, together with its kind and result enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountNumber;

/// Transaction identifier
///
/// Globally unique and opaque. Freshly generated ids are 32 lowercase hex
/// characters.
pub type TransactionId = String;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A debit reducing the account balance
    Use,

    /// A reversal referencing a prior use by transaction id
    Cancel,
}

/// Outcome recorded for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionResult {
    Success,
    Failure,
}

/// Ledger entry
///
/// Records are never updated or deleted once written. For a given account they
/// form a total order by `transacted_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction identifier
    pub transaction_id: TransactionId,

    /// Use or cancel
    pub kind: TransactionKind,

    /// Success or failure
    pub result: TransactionResult,

    /// The account this entry refers to
    pub account_number: AccountNumber,

    /// The requested amount
    pub amount: u64,

    /// Account balance after the mutation, or at failure time when nothing
    /// was mutated
    pub balance_snapshot: u64,

    /// When the entry was created
    pub transacted_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Build a record stamped with a fresh transaction id and the current time
    pub fn new(
        kind: TransactionKind,
        result: TransactionResult,
        account_number: impl Into<AccountNumber>,
        amount: u64,
        balance_snapshot: u64,
    ) -> Self {
        TransactionRecord {
            transaction_id: new_transaction_id(),
            kind,
            result,
            account_number: account_number.into(),
            amount,
            balance_snapshot,
            transacted_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == TransactionResult::Success
    }
}

/// Generate a fresh transaction id (v4 UUID rendered without hyphens)
pub fn new_transaction_id() -> TransactionId {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_id_is_32_hex_chars() {
        let id = new_transaction_id();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_new_transaction_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| new_transaction_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_new_record_carries_fields() {
        let record = TransactionRecord::new(
            TransactionKind::Use,
            TransactionResult::Success,
            "1000000000",
            1_000,
            9_000,
        );

        assert_eq!(record.kind, TransactionKind::Use);
        assert!(record.is_success());
        assert_eq!(record.account_number, "1000000000");
        assert_eq!(record.amount, 1_000);
        assert_eq!(record.balance_snapshot, 9_000);
    }
}
