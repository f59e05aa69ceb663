//! Thread-safe append-only transaction ledger
//!
//! This module provides the `InMemoryLedger` struct, which implements the
//! [`TransactionLedger`] collaborator trait.
//!
//! # Design
//!
//! Records are stored in a `DashMap` keyed by transaction id. A second map
//! indexes transaction ids per account in insertion order so an account's
//! audit history can be produced without scanning the whole ledger.
//!
//! # Immutability
//!
//! There is no update or delete operation. Inserting a record whose id is
//! already present is rejected with `DuplicateTransaction` and the existing
//! record is left untouched.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::traits::TransactionLedger;
use crate::types::{AccountNumber, LedgerError, TransactionId, TransactionRecord};

/// Thread-safe in-memory transaction ledger
///
/// Concurrent inserts from many accounts need no coordination beyond the
/// DashMap's internal sharding.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Records by transaction id
    records: DashMap<TransactionId, TransactionRecord>,

    /// Transaction ids per account, in insertion order
    by_account: DashMap<AccountNumber, Vec<TransactionId>>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_account: DashMap::new(),
        }
    }

    /// Number of records in the ledger
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of every record, ordered by account then timestamp
    pub fn all_records(&self) -> Vec<TransactionRecord> {
        let mut accounts: Vec<AccountNumber> =
            self.by_account.iter().map(|entry| entry.key().clone()).collect();
        accounts.sort();

        accounts
            .iter()
            .flat_map(|account| self.ordered_history(account))
            .collect()
    }

    fn ordered_history(&self, account_number: &str) -> Vec<TransactionRecord> {
        let ids = match self.by_account.get(account_number) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };

        let mut records: Vec<TransactionRecord> = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|entry| entry.value().clone()))
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        records.sort_by_key(|record| record.transacted_at);
        records
    }
}

impl TransactionLedger for InMemoryLedger {
    fn insert(&self, record: TransactionRecord) -> Result<TransactionRecord, LedgerError> {
        match self.records.entry(record.transaction_id.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::duplicate_transaction(&record.transaction_id))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
            }
        }

        self.by_account
            .entry(record.account_number.clone())
            .or_default()
            .push(record.transaction_id.clone());

        Ok(record)
    }

    fn find_by_id(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, LedgerError> {
        Ok(self
            .records
            .get(transaction_id)
            .map(|entry| entry.value().clone()))
    }

    fn history(&self, account_number: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(self.ordered_history(account_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionKind, TransactionResult};
    use chrono::{Duration, Utc};

    fn use_record(account: &str, amount: u64, snapshot: u64) -> TransactionRecord {
        TransactionRecord::new(
            TransactionKind::Use,
            TransactionResult::Success,
            account,
            amount,
            snapshot,
        )
    }

    #[test]
    fn test_insert_and_find_by_id() {
        let ledger = InMemoryLedger::new();
        let record = use_record("1000000000", 1_000, 9_000);

        let inserted = ledger.insert(record.clone()).unwrap();
        assert_eq!(inserted, record);

        let found = ledger.find_by_id(&record.transaction_id).unwrap();
        assert_eq!(found, Some(record));
    }

    #[test]
    fn test_find_unknown_id_returns_none() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_is_rejected_and_first_record_kept() {
        let ledger = InMemoryLedger::new();
        let first = use_record("1000000000", 1_000, 9_000);
        let mut second = use_record("2000000000", 5_000, 0);
        second.transaction_id = first.transaction_id.clone();

        ledger.insert(first.clone()).unwrap();
        let result = ledger.insert(second);

        assert_eq!(
            result.unwrap_err(),
            LedgerError::duplicate_transaction(&first.transaction_id)
        );
        assert_eq!(ledger.find_by_id(&first.transaction_id).unwrap(), Some(first));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.history("2000000000").unwrap().is_empty());
    }

    #[test]
    fn test_history_is_ordered_by_timestamp() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();

        let mut later = use_record("1000000000", 10, 90);
        later.transacted_at = now;
        let mut earlier = use_record("1000000000", 10, 100);
        earlier.transacted_at = now - Duration::seconds(5);

        ledger.insert(later.clone()).unwrap();
        ledger.insert(earlier.clone()).unwrap();
        ledger.insert(use_record("2000000000", 10, 0)).unwrap();

        let history = ledger.history("1000000000").unwrap();
        assert_eq!(history, vec![earlier, later]);
    }

    #[test]
    fn test_history_keeps_insertion_order_on_equal_timestamps() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();

        let mut first = use_record("1000000000", 10, 90);
        first.transacted_at = now;
        let mut second = use_record("1000000000", 20, 70);
        second.transacted_at = now;

        ledger.insert(first.clone()).unwrap();
        ledger.insert(second.clone()).unwrap();

        assert_eq!(ledger.history("1000000000").unwrap(), vec![first, second]);
    }

    #[test]
    fn test_all_records_groups_by_account() {
        let ledger = InMemoryLedger::new();
        ledger.insert(use_record("2", 10, 0)).unwrap();
        ledger.insert(use_record("1", 10, 0)).unwrap();
        ledger.insert(use_record("1", 20, 0)).unwrap();

        let accounts: Vec<String> = ledger
            .all_records()
            .into_iter()
            .map(|r| r.account_number)
            .collect();

        assert_eq!(accounts, vec!["1", "1", "2"]);
    }

    #[test]
    fn test_concurrent_inserts() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(InMemoryLedger::new());
        let mut handles = vec![];

        for i in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    ledger.insert(use_record(&i.to_string(), 10, 0)).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 400);
        for i in 0..8 {
            assert_eq!(ledger.history(&i.to_string()).unwrap().len(), 50);
        }
    }
}
