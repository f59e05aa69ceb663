//! Processing strategy module for operation replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and driving the balance engine. This allows
//! different processing implementations (synchronous, asynchronous batch) to
//! be selected at runtime.

use std::io::Write;
use std::path::Path;

use crate::cli::StrategyType;
use crate::core::Replayer;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay operations from `input_path` and write final account states
    ///
    /// # Arguments
    ///
    /// * `replayer` - Seeded replayer the operations are applied to
    /// * `input_path` - Path to the operations CSV file
    /// * `output` - Writer receiving the final account states as CSV
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the replay completed (rejected operations included)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// Malformed rows and rejected operations are logged and do not stop the
    /// replay.
    fn process(
        &self,
        replayer: &Replayer,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
