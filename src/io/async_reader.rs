//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of replay operations for the async strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (OperationCsvRecord, convert_operation_record)
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{convert_operation_record, OperationCsvRecord};
use crate::types::Operation;

/// Asynchronous operations reader
///
/// Maintains streaming behavior with memory bounded by the batch size.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of operations
    ///
    /// Reads up to `batch_size` rows. Rows that fail to parse or convert are
    /// logged and skipped without counting towards the batch.
    ///
    /// # Returns
    ///
    /// The converted operations in file order. An empty vector means the end
    /// of the input was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OperationCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_operation_record(csv_record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => warn!(error = %e, "skipping operation"),
                },
                Some(Err(e)) => warn!(error = %e, "skipping unparseable row"),
                None => break,
            }
        }

        batch
    }
}
