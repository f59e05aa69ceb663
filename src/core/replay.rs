//! Replay of recorded operations against a seeded engine
//!
//! This module provides the `Replayer` struct, which owns an in-memory account
//! store and ledger seeded from an accounts file, drives a [`BalanceEngine`]
//! with parsed [`Operation`]s and remembers labelled transaction ids so later
//! rows can cancel or query them.
//!
//! # Batches
//!
//! `process_batch` partitions a batch by account. Each partition runs on the
//! blocking thread pool in file order, partitions run concurrently, and
//! queries run once every partition of the batch has finished.
//!
//! A label is only visible to rows processed after the `use` that bound it.
//! Within one batch that holds for rows of the same account; a cancel that
//! names a label bound in another account's partition of the same batch may
//! not see it and falls back to treating the reference as a literal id.
//!
//! # Queries
//!
//! Query rows change nothing, so they never reach the account output. Their
//! records are reported as `query result` events at `info` level, and misses
//! as `operation rejected` events.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::core::account_store::InMemoryAccountStore;
use crate::core::config::EngineConfig;
use crate::core::engine::BalanceEngine;
use crate::core::ledger::InMemoryLedger;
use crate::core::lock::LockManager;
use crate::types::{
    Account, AccountNumber, LedgerError, Operation, TransactionId, TransactionRecord, User,
};

/// Outcome of replaying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was replayed
    pub operation: Operation,

    /// The record returned by the engine, or why the operation was rejected
    pub result: Result<TransactionRecord, LedgerError>,
}

/// Replays operations against an engine backed by in-memory stores
///
/// Cloning is cheap and clones share all state, so a `Replayer` can be handed
/// to many tasks at once.
#[derive(Debug, Clone)]
pub struct Replayer {
    engine: BalanceEngine,
    accounts: Arc<InMemoryAccountStore>,
    ledger: Arc<InMemoryLedger>,

    /// Transaction ids by the label given in the operation's `ref` column
    labels: Arc<DashMap<String, TransactionId>>,
}

impl Replayer {
    /// Create a Replayer seeded with `accounts`
    ///
    /// Every account owner is registered as a user.
    ///
    /// # Arguments
    ///
    /// * `accounts` - Initial account states
    /// * `locks` - Lock manager the engine serializes account mutations with
    /// * `config` - Engine configuration
    pub fn new(accounts: Vec<Account>, locks: Arc<dyn LockManager>, config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryAccountStore::new());
        for account in accounts {
            store.insert_user(User::new(account.owner, format!("user-{}", account.owner)));
            store.insert_account(account);
        }
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = BalanceEngine::new(store.clone(), ledger.clone(), locks, config);

        Self {
            engine,
            accounts: store,
            ledger,
            labels: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &BalanceEngine {
        &self.engine
    }

    /// Final account states sorted by account number
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.get_all_accounts()
    }

    /// Every ledger record, grouped by account and oldest first
    pub fn ledger_records(&self) -> Vec<TransactionRecord> {
        self.ledger.all_records()
    }

    /// Transaction id bound to `label`, if any
    pub fn label(&self, label: &str) -> Option<TransactionId> {
        self.labels.get(label).map(|entry| entry.value().clone())
    }

    fn resolve(&self, reference: &str) -> TransactionId {
        self.label(reference)
            .unwrap_or_else(|| reference.to_string())
    }

    /// Replay one operation
    ///
    /// Rejections are logged and returned in the result; they never stop a
    /// replay. A successful query is reported as an `info` event carrying the
    /// whole record.
    pub fn apply(&self, operation: Operation) -> ProcessingResult {
        let result = match &operation {
            Operation::Use {
                user,
                account,
                amount,
                label,
            } => {
                let result = self.engine.use_balance(*user, account, *amount);
                if let (Ok(record), Some(label)) = (&result, label) {
                    self.labels
                        .insert(label.clone(), record.transaction_id.clone());
                }
                result
            }
            Operation::Cancel {
                account,
                amount,
                reference,
            } => self
                .engine
                .cancel_balance(&self.resolve(reference), account, *amount),
            Operation::Query { reference } => self.engine.query_transaction(&self.resolve(reference)),
        };

        match (&operation, &result) {
            (Operation::Query { reference }, Ok(record)) => info!(
                reference = %reference,
                transaction_id = %record.transaction_id,
                kind = ?record.kind,
                result = ?record.result,
                account = %record.account_number,
                amount = record.amount,
                balance_snapshot = record.balance_snapshot,
                transacted_at = %record.transacted_at,
                "query result"
            ),
            (_, Ok(record)) => debug!(
                op = operation.name(),
                transaction_id = %record.transaction_id,
                "operation applied"
            ),
            (_, Err(e)) => info!(op = operation.name(), code = e.code(), error = %e, "operation rejected"),
        }

        ProcessingResult { operation, result }
    }

    /// Split a batch into per-account partitions and the queries
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one partition or in the queries
    /// - Operations keep their original relative order
    pub fn partition_by_account(
        &self,
        batch: Vec<Operation>,
    ) -> (HashMap<AccountNumber, Vec<Operation>>, Vec<Operation>) {
        let mut partitions: HashMap<AccountNumber, Vec<Operation>> = HashMap::new();
        let mut queries = Vec::new();

        for operation in batch {
            match operation.account() {
                Some(account) => partitions
                    .entry(account.to_string())
                    .or_default()
                    .push(operation),
                None => queries.push(operation),
            }
        }

        (partitions, queries)
    }

    /// Replay one account's operations in order
    pub fn process_account_operations(&self, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        operations
            .into_iter()
            .map(|operation| self.apply(operation))
            .collect()
    }

    /// Replay a batch with per-account parallelism
    ///
    /// Results of different accounts may interleave in any order; results of
    /// one account keep file order. Query results come last.
    pub async fn process_batch(&self, batch: Vec<Operation>) -> Vec<ProcessingResult> {
        let (partitions, queries) = self.partition_by_account(batch);

        // Engine calls block on account locks, so they stay off the async workers
        let mut tasks = Vec::with_capacity(partitions.len());
        for (_account, operations) in partitions {
            let replayer = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                replayer.process_account_operations(operations)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(account_results) => results.extend(account_results),
                Err(e) => error!(error = %e, "replay task failed"),
            }
        }

        results.extend(queries.into_iter().map(|query| self.apply(query)));
        results
    }
}
