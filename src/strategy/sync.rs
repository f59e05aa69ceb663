//! Synchronous processing strategy
//!
//! Replays operations one row at a time on the calling thread, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Operation handling to `Replayer` (engine and labels)
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! Memory usage is O(accounts + ledger), independent of the input size.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::core::Replayer;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use account_ledger::core::{EngineConfig, InMemoryLockManager, Replayer};
/// use account_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let replayer = Replayer::new(vec![], Arc::new(InMemoryLockManager::new()), EngineConfig::default());
/// let mut output = std::io::stdout();
///
/// SyncProcessingStrategy
///     .process(&replayer, Path::new("operations.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        replayer: &Replayer,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let reader = SyncReader::new(input_path)?;

        for row in reader {
            match row {
                Ok(operation) => {
                    replayer.apply(operation);
                }
                Err(e) => warn!(error = %e, "skipping operation"),
            }
        }

        write_accounts_csv(&replayer.accounts(), output)
    }
}
