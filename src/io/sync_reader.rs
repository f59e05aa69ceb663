//! Synchronous CSV readers
//!
//! Provides a streaming iterator over replay operations and a loader for the
//! accounts seed file. Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding `Result<Operation, String>`
//! for each CSV row:
//!
//! ```no_run
//! use account_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Replaying: {:?}", operation),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::io::csv_format::{convert_operation_record, AccountCsvRecord, OperationCsvRecord};
use crate::types::{Account, Operation};

fn open_csv(path: &Path) -> Result<csv::Reader<File>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Synchronous operations reader
///
/// Streams operations one row at a time with constant memory usage.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace from all fields and allows rows with
    /// missing trailing columns.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the operations CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<OperationCsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        // +1 for the header row
        let line = self.line_num + 1;
        Some(match next {
            Ok(csv_record) => {
                convert_operation_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}

/// Load every account from an accounts seed file
///
/// Unlike operations, a malformed account row is fatal: replaying against a
/// partially seeded store would produce misleading results.
///
/// # Arguments
///
/// * `path` - Path to a CSV file with columns account, owner, status, balance
///
/// # Returns
///
/// * `Ok(Vec<Account>)` in file order
/// * `Err(String)` naming the file and line that failed
pub fn read_accounts(path: &Path) -> Result<Vec<Account>, String> {
    let mut reader = open_csv(path)?;
    let mut accounts = Vec::new();

    for (index, row) in reader.deserialize::<AccountCsvRecord>().enumerate() {
        let record = row.map_err(|e| {
            format!("{} line {}: invalid account row: {}", path.display(), index + 2, e)
        })?;
        accounts.push(Account::from(record));
    }

    Ok(accounts)
}
