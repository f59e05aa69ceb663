//! Balance mutation engine
//!
//! This module provides the `BalanceEngine`, which orchestrates per-account
//! locking, validation, balance mutation and ledger recording for balance
//! usage and cancellation.
//!
//! # Architecture
//!
//! ```text
//! BalanceEngine
//!     ├── Arc<dyn AccountStore>       (accounts, users, balance deltas)
//!     ├── Arc<dyn TransactionLedger>  (append-only records)
//!     ├── Arc<dyn LockManager>        (per-account mutual exclusion)
//!     └── EngineConfig                (amount bounds, lock timings, window)
//! ```
//!
//! # Recording
//!
//! Every admitted attempt leaves a ledger record. Successful operations write
//! a SUCCESS record while the account lock is still held; rejected ones write
//! a FAILURE record after the lock has been released. Failure recording is
//! best-effort and never replaces the error returned to the caller.
//!
//! Requests rejected before admission (out-of-range amount, lock unavailable)
//! and internal collaborator failures leave no record.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use tracing::{debug, error, warn};

use crate::core::config::EngineConfig;
use crate::core::lock::{with_lease, LockHandle, LockManager};
use crate::core::traits::{AccountStore, TransactionLedger};
use crate::types::{
    Account, LedgerError, LockError, TransactionKind, TransactionRecord, TransactionResult, User,
    UserId,
};

/// Balance usage and cancellation engine
///
/// Cheap to clone; clones share the same collaborators and may be used from
/// many threads at once.
#[derive(Clone)]
pub struct BalanceEngine {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn TransactionLedger>,
    locks: Arc<dyn LockManager>,
    config: EngineConfig,
}

impl fmt::Debug for BalanceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BalanceEngine {
    /// Create a new BalanceEngine
    ///
    /// # Arguments
    ///
    /// * `accounts` - Account and user storage
    /// * `ledger` - Append-only transaction ledger
    /// * `locks` - Lock manager used to serialize mutations per account
    /// * `config` - Amount bounds, lock timings and cancellation window
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn TransactionLedger>,
        locks: Arc<dyn LockManager>,
        config: EngineConfig,
    ) -> Self {
        Self {
            accounts,
            ledger,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Debit `amount` from an account on behalf of its owner
    ///
    /// The whole read-validate-mutate-record sequence runs under the account's
    /// lock, so concurrent uses of the same account are serialized.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The requesting user; must own the account
    /// * `account_number` - The account to debit
    /// * `amount` - Amount to debit, within the configured bounds
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionRecord)` - The SUCCESS/USE record with the balance
    ///   after the debit
    /// * `Err(LedgerError)` - Why the usage was rejected
    ///
    /// # Errors
    ///
    /// Validation runs in this order and stops at the first failure:
    /// - `InvalidAmount` if the amount is out of bounds (no record)
    /// - `LockUnavailable` if the account lock cannot be acquired (no record)
    /// - `UserNotFound`, `AccountNotFound`
    /// - `UserAccountUnmatched` if the user does not own the account
    /// - `AccountAlreadyClosed`
    /// - `AmountExceedsBalance`
    ///
    /// `LockUnavailable` is also returned, without a record, when the lease
    /// expired during validation; the balance is then left untouched.
    ///
    /// `LedgerWriteFailed` is returned if the SUCCESS record could not be
    /// written; the debit has been reversed by then.
    pub fn use_balance(
        &self,
        user_id: UserId,
        account_number: &str,
        amount: u64,
    ) -> Result<TransactionRecord, LedgerError> {
        self.config.validate_amount(amount)?;

        let key = self.config.lock_key(account_number);
        let outcome = with_lease(
            self.locks.as_ref(),
            &key,
            self.config.lock_wait,
            self.config.lock_hold,
            |lease| self.debit(lease, user_id, account_number, amount),
        )
        .map_err(|e| {
            warn!(account = account_number, error = %e, "could not acquire account lock");
            LedgerError::lock_unavailable(account_number, e)
        })?;

        outcome.inspect_err(|err| {
            if err.is_recordable() {
                self.record_failure(TransactionKind::Use, account_number, amount);
            }
        })
    }

    /// Cancel a previous use by transaction id
    ///
    /// The request is authorized by presenting the original transaction id,
    /// its account and its exact amount. The balance is left untouched and
    /// no account lock is taken.
    ///
    /// # Arguments
    ///
    /// * `transaction_id` - Id of the use being cancelled
    /// * `account_number` - Account the use was made against
    /// * `amount` - Must equal the original amount
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionRecord)` - The SUCCESS/CANCEL record, snapshotting the
    ///   current balance
    /// * `Err(LedgerError)` - Why the cancellation was rejected
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`, `AccountNotFound`
    /// - `TransactionAccountMismatch` if the original belongs to another account
    /// - `CancelMustBeFullAmount` if `amount` differs from the original
    /// - `CancellationWindowExpired` if the original is older than the window
    pub fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: u64,
    ) -> Result<TransactionRecord, LedgerError> {
        self.cancel(transaction_id, account_number, amount)
            .inspect_err(|err| {
                if err.is_recordable() {
                    self.record_failure(TransactionKind::Cancel, account_number, amount);
                }
            })
    }

    /// Look up a ledger record by transaction id
    pub fn query_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, LedgerError> {
        self.ledger
            .find_by_id(transaction_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))
    }

    /// Every ledger record for an account, oldest first
    pub fn account_history(&self, account_number: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.ledger.history(account_number)
    }

    /// Locked section of `use_balance`
    fn debit(
        &self,
        lease: &LockHandle,
        user_id: UserId,
        account_number: &str,
        amount: u64,
    ) -> Result<TransactionRecord, LedgerError> {
        let user = self
            .accounts
            .find_user(user_id)?
            .ok_or_else(|| LedgerError::user_not_found(user_id))?;
        let account = self
            .accounts
            .find_by_number(account_number)?
            .ok_or_else(|| LedgerError::account_not_found(account_number))?;

        validate_use(&user, &account, amount)?;

        let delta = i64::try_from(amount)
            .map_err(|_| LedgerError::arithmetic_overflow("use", account_number))?;

        // Another caller may have taken over the key once the hold elapsed
        if lease.is_expired() {
            warn!(account = account_number, key = lease.key(), "lease expired before debit");
            return Err(LedgerError::lock_unavailable(
                account_number,
                LockError::lease_expired(lease.key()),
            ));
        }

        let updated = self
            .accounts
            .apply_delta(account_number, -delta)
            .map_err(|e| match e {
                LedgerError::ArithmeticUnderflow { .. } => {
                    let balance = self
                        .accounts
                        .find_by_number(account_number)
                        .ok()
                        .flatten()
                        .map_or(0, |account| account.balance);
                    LedgerError::amount_exceeds_balance(account_number, balance, amount)
                }
                other => other,
            })?;

        let record = TransactionRecord::new(
            TransactionKind::Use,
            TransactionResult::Success,
            account_number,
            amount,
            updated.balance,
        );

        match self.ledger.insert(record) {
            Ok(record) => {
                debug!(
                    account = account_number,
                    amount,
                    balance = record.balance_snapshot,
                    transaction_id = %record.transaction_id,
                    "balance used"
                );
                Ok(record)
            }
            Err(cause) => Err(self.compensate(account_number, amount, delta, cause)),
        }
    }

    /// Reverse a debit whose SUCCESS record could not be written
    ///
    /// Must be called with the account lock still held.
    fn compensate(&self, account_number: &str, amount: u64, delta: i64, cause: LedgerError) -> LedgerError {
        match self.accounts.apply_delta(account_number, delta) {
            Ok(account) => warn!(
                account = account_number,
                amount,
                balance = account.balance,
                error = %cause,
                "ledger write failed, debit reversed"
            ),
            Err(compensation) => error!(
                reconcile = true,
                account = account_number,
                amount,
                error = %cause,
                compensation_error = %compensation,
                "ledger write failed and debit could not be reversed"
            ),
        }

        LedgerError::ledger_write_failed(account_number, cause.to_string())
    }

    fn cancel(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: u64,
    ) -> Result<TransactionRecord, LedgerError> {
        let original = self
            .ledger
            .find_by_id(transaction_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        let account = self
            .accounts
            .find_by_number(account_number)?
            .ok_or_else(|| LedgerError::account_not_found(account_number))?;

        validate_cancel(
            &original,
            &account,
            amount,
            Utc::now(),
            self.config.cancellation_window_months,
        )?;

        let record = self.ledger.insert(TransactionRecord::new(
            TransactionKind::Cancel,
            TransactionResult::Success,
            account_number,
            amount,
            account.balance,
        ))?;

        debug!(
            account = account_number,
            amount,
            original = transaction_id,
            transaction_id = %record.transaction_id,
            "balance use cancelled"
        );
        Ok(record)
    }

    /// Append a FAILURE record snapshotting the account's current balance
    ///
    /// Errors here are logged and dropped.
    fn record_failure(&self, kind: TransactionKind, account_number: &str, amount: u64) {
        let account = match self.accounts.find_by_number(account_number) {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!(
                    account = account_number,
                    ?kind,
                    "no account to snapshot, failure not recorded"
                );
                return;
            }
            Err(e) => {
                warn!(account = account_number, ?kind, error = %e, "failure record skipped");
                return;
            }
        };

        let record = TransactionRecord::new(
            kind,
            TransactionResult::Failure,
            account_number,
            amount,
            account.balance,
        );
        if let Err(e) = self.ledger.insert(record) {
            warn!(account = account_number, ?kind, error = %e, "could not write failure record");
        }
    }
}

fn validate_use(user: &User, account: &Account, amount: u64) -> Result<(), LedgerError> {
    if account.owner != user.id {
        return Err(LedgerError::user_account_unmatched(
            user.id,
            &account.number,
            account.owner,
        ));
    }
    if !account.is_active() {
        return Err(LedgerError::account_already_closed(&account.number));
    }
    if account.balance < amount {
        return Err(LedgerError::amount_exceeds_balance(
            &account.number,
            account.balance,
            amount,
        ));
    }
    Ok(())
}

fn validate_cancel(
    original: &TransactionRecord,
    account: &Account,
    amount: u64,
    now: DateTime<Utc>,
    window_months: u32,
) -> Result<(), LedgerError> {
    if original.account_number != account.number {
        return Err(LedgerError::transaction_account_mismatch(
            &original.transaction_id,
            &original.account_number,
            &account.number,
        ));
    }
    if original.amount != amount {
        return Err(LedgerError::cancel_must_be_full_amount(
            &original.transaction_id,
            original.amount,
            amount,
        ));
    }
    // A cutoff before the representable range means nothing is too old
    if let Some(cutoff) = now.checked_sub_months(Months::new(window_months)) {
        if original.transacted_at < cutoff {
            return Err(LedgerError::cancellation_window_expired(
                &original.transaction_id,
                original.transacted_at,
            ));
        }
    }
    Ok(())
}
