//! Error types for the account ledger
//!
//! This module defines every error the balance engine and its collaborators can
//! surface. Errors carry enough context for logging and for callers that need to
//! branch on the specific cause of a rejection.
//!
//! # Error Categories
//!
//! - **Not found**: user, account or transaction missing
//! - **Validation**: ownership mismatch, closed account, insufficient balance,
//!   partial cancel, expired cancellation window, out-of-range amount
//! - **Concurrency**: the account lock could not be acquired
//! - **Internal**: unexpected collaborator failure

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::account::UserId;

/// Broad classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Concurrency,
    Internal,
}

/// Failure to obtain a lock from a [`crate::core::lock::LockManager`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The key was still held by another caller when the wait bound elapsed
    #[error("Timed out after {waited:?} waiting for lock '{key}'")]
    Timeout {
        /// The lock key
        key: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// The mutual-exclusion substrate itself could not be reached
    #[error("Lock backend unavailable for '{key}': {message}")]
    BackendUnavailable {
        /// The lock key
        key: String,
        /// Description of the backend failure
        message: String,
    },

    /// The hold timeout elapsed before the protected work was done
    #[error("Lease on '{key}' expired before the mutation")]
    LeaseExpired {
        /// The lock key
        key: String,
    },
}

impl LockError {
    pub fn timeout(key: &str, waited: Duration) -> Self {
        LockError::Timeout {
            key: key.to_string(),
            waited,
        }
    }

    pub fn backend_unavailable(key: &str, message: impl Into<String>) -> Self {
        LockError::BackendUnavailable {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn lease_expired(key: &str) -> Self {
        LockError::LeaseExpired {
            key: key.to_string(),
        }
    }
}

/// Main error type for the account ledger
///
/// Not-found, validation and concurrency errors are surfaced to callers
/// verbatim. Internal errors indicate a collaborator misbehaved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The requesting user does not exist
    #[error("User {user} not found")]
    UserNotFound {
        /// The user id that was looked up
        user: UserId,
    },

    /// No account exists with the given number
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account number that was looked up
        account: String,
    },

    /// No ledger record exists with the given transaction id
    #[error("Transaction {transaction_id} not found")]
    TransactionNotFound {
        /// The transaction id that was looked up
        transaction_id: String,
    },

    /// Requested amount is outside the configured per-request bounds
    #[error("Amount {amount} is outside the allowed range [{min}, {max}]")]
    InvalidAmount {
        /// The requested amount
        amount: u64,
        /// Smallest allowed amount
        min: u64,
        /// Largest allowed amount
        max: u64,
    },

    /// The account is owned by someone other than the requesting user
    #[error("User {user} does not own account {account} (owner is {owner})")]
    UserAccountUnmatched {
        /// The requesting user
        user: UserId,
        /// The account number
        account: String,
        /// The actual owner
        owner: UserId,
    },

    /// The account is closed
    #[error("Account {account} is already closed")]
    AccountAlreadyClosed {
        /// The account number
        account: String,
    },

    /// The requested amount exceeds the current balance
    #[error("Amount exceeds balance for account {account}: balance {balance}, requested {requested}")]
    AmountExceedsBalance {
        /// The account number
        account: String,
        /// Current balance
        balance: u64,
        /// Requested amount
        requested: u64,
    },

    /// The transaction being cancelled belongs to a different account
    #[error("Transaction {transaction_id} belongs to account {expected}, not {actual}")]
    TransactionAccountMismatch {
        /// The original transaction id
        transaction_id: String,
        /// Account recorded on the original transaction
        expected: String,
        /// Account given in the cancel request
        actual: String,
    },

    /// Partial cancellation was requested
    #[error("Cancel of transaction {transaction_id} must be for the full amount {original}, got {requested}")]
    CancelMustBeFullAmount {
        /// The original transaction id
        transaction_id: String,
        /// Amount of the original transaction
        original: u64,
        /// Amount requested for cancellation
        requested: u64,
    },

    /// The original transaction is too old to be cancelled
    #[error("Transaction {transaction_id} made at {transacted_at} is outside the cancellation window")]
    CancellationWindowExpired {
        /// The original transaction id
        transaction_id: String,
        /// When the original transaction happened
        transacted_at: DateTime<Utc>,
    },

    /// The account lock could not be acquired
    #[error("Lock unavailable for account {account}: {source}")]
    LockUnavailable {
        /// The account number
        account: String,
        /// Why acquisition failed
        #[source]
        source: LockError,
    },

    /// A ledger record with the same id already exists
    #[error("Duplicate transaction id {transaction_id}")]
    DuplicateTransaction {
        /// The duplicated transaction id
        transaction_id: String,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// The account number
        account: String,
    },

    /// Arithmetic underflow would occur
    #[error("Arithmetic underflow in {operation} for account {account}")]
    ArithmeticUnderflow {
        /// Operation that would underflow
        operation: String,
        /// The account number
        account: String,
    },

    /// The balance was mutated but the success record could not be written
    ///
    /// The engine compensates the mutation before returning this error.
    #[error("Ledger write failed for account {account} after balance mutation: {message}")]
    LedgerWriteFailed {
        /// The account number
        account: String,
        /// Description of the underlying failure
        message: String,
    },

    /// A storage collaborator failed unexpectedly
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },
}

impl LedgerError {
    /// Stable identifier for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UserNotFound { .. } => "USER_NOT_FOUND",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::TransactionNotFound { .. } => "TRANSACTION_NOT_FOUND",
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::UserAccountUnmatched { .. } => "USER_ACCOUNT_UNMATCHED",
            LedgerError::AccountAlreadyClosed { .. } => "ACCOUNT_ALREADY_CLOSED",
            LedgerError::AmountExceedsBalance { .. } => "AMOUNT_EXCEEDS_BALANCE",
            LedgerError::TransactionAccountMismatch { .. } => "TRANSACTION_ACCOUNT_MISMATCH",
            LedgerError::CancelMustBeFullAmount { .. } => "CANCEL_MUST_BE_FULL_AMOUNT",
            LedgerError::CancellationWindowExpired { .. } => "CANCELLATION_WINDOW_EXPIRED",
            LedgerError::LockUnavailable { .. } => "LOCK_UNAVAILABLE",
            LedgerError::DuplicateTransaction { .. } => "DUPLICATE_TRANSACTION",
            LedgerError::ArithmeticOverflow { .. } => "ARITHMETIC_OVERFLOW",
            LedgerError::ArithmeticUnderflow { .. } => "ARITHMETIC_UNDERFLOW",
            LedgerError::LedgerWriteFailed { .. } => "LEDGER_WRITE_FAILED",
            LedgerError::Storage { .. } => "STORAGE",
        }
    }

    /// Broad classification used to decide how a failure is handled
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::UserNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::TransactionNotFound { .. } => ErrorCategory::NotFound,
            LedgerError::InvalidAmount { .. }
            | LedgerError::UserAccountUnmatched { .. }
            | LedgerError::AccountAlreadyClosed { .. }
            | LedgerError::AmountExceedsBalance { .. }
            | LedgerError::TransactionAccountMismatch { .. }
            | LedgerError::CancelMustBeFullAmount { .. }
            | LedgerError::CancellationWindowExpired { .. } => ErrorCategory::Validation,
            LedgerError::LockUnavailable { .. } => ErrorCategory::Concurrency,
            LedgerError::DuplicateTransaction { .. }
            | LedgerError::ArithmeticOverflow { .. }
            | LedgerError::ArithmeticUnderflow { .. }
            | LedgerError::LedgerWriteFailed { .. }
            | LedgerError::Storage { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether a rejected attempt with this error gets a FAILURE ledger record
    pub fn is_recordable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::NotFound | ErrorCategory::Validation
        )
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn user_not_found(user: UserId) -> Self {
        LedgerError::UserNotFound { user }
    }

    pub fn account_not_found(account: &str) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    pub fn transaction_not_found(transaction_id: &str) -> Self {
        LedgerError::TransactionNotFound {
            transaction_id: transaction_id.to_string(),
        }
    }

    pub fn invalid_amount(amount: u64, min: u64, max: u64) -> Self {
        LedgerError::InvalidAmount { amount, min, max }
    }

    pub fn user_account_unmatched(user: UserId, account: &str, owner: UserId) -> Self {
        LedgerError::UserAccountUnmatched {
            user,
            account: account.to_string(),
            owner,
        }
    }

    pub fn account_already_closed(account: &str) -> Self {
        LedgerError::AccountAlreadyClosed {
            account: account.to_string(),
        }
    }

    pub fn amount_exceeds_balance(account: &str, balance: u64, requested: u64) -> Self {
        LedgerError::AmountExceedsBalance {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    pub fn transaction_account_mismatch(transaction_id: &str, expected: &str, actual: &str) -> Self {
        LedgerError::TransactionAccountMismatch {
            transaction_id: transaction_id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn cancel_must_be_full_amount(transaction_id: &str, original: u64, requested: u64) -> Self {
        LedgerError::CancelMustBeFullAmount {
            transaction_id: transaction_id.to_string(),
            original,
            requested,
        }
    }

    pub fn cancellation_window_expired(transaction_id: &str, transacted_at: DateTime<Utc>) -> Self {
        LedgerError::CancellationWindowExpired {
            transaction_id: transaction_id.to_string(),
            transacted_at,
        }
    }

    pub fn lock_unavailable(account: &str, source: LockError) -> Self {
        LedgerError::LockUnavailable {
            account: account.to_string(),
            source,
        }
    }

    pub fn duplicate_transaction(transaction_id: &str) -> Self {
        LedgerError::DuplicateTransaction {
            transaction_id: transaction_id.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    pub fn arithmetic_underflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticUnderflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    pub fn ledger_write_failed(account: &str, message: impl Into<String>) -> Self {
        LedgerError::LedgerWriteFailed {
            account: account.to_string(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}
