use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::core::config::{
    EngineConfig, DEFAULT_LOCK_HOLD, DEFAULT_LOCK_WAIT, DEFAULT_MAX_AMOUNT, DEFAULT_MIN_AMOUNT,
};
use crate::strategy::BatchConfig;

/// Replay balance operations against a seeded account ledger
#[derive(Parser, Debug)]
#[command(name = "ledger-replay")]
#[command(about = "Replay balance use/cancel operations against seeded accounts", long_about = None)]
pub struct CliArgs {
    /// Operations CSV file path
    #[arg(value_name = "OPERATIONS", help = "Path to the operations CSV file")]
    pub input_file: PathBuf,

    /// Accounts seed file
    #[arg(
        long = "accounts",
        value_name = "ACCOUNTS",
        help = "Path to the accounts CSV file (account,owner,status,balance)"
    )]
    pub accounts_file: PathBuf,

    /// Processing strategy to use for replaying operations
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for per-account parallel replay"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of accounts replayed concurrently (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of accounts replayed concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    #[arg(long = "min-amount", value_name = "AMOUNT", help = "Smallest amount a use may request (default: 10)")]
    pub min_amount: Option<u64>,

    #[arg(long = "max-amount", value_name = "AMOUNT", help = "Largest amount a use may request (default: 1000000000)")]
    pub max_amount: Option<u64>,

    #[arg(long = "lock-wait-ms", value_name = "MS", help = "How long to wait for a busy account lock (default: 1000)")]
    pub lock_wait_ms: Option<u64>,

    #[arg(long = "lock-hold-ms", value_name = "MS", help = "How long an account lock may be held (default: 15000)")]
    pub lock_hold_ms: Option<u64>,

    /// Where to write the full ledger
    #[arg(long = "ledger-out", value_name = "PATH", help = "Write every ledger record to this CSV file")]
    pub ledger_out: Option<PathBuf>,

    #[arg(long = "json-logs", help = "Emit logs to stderr as JSON")]
    pub json_logs: bool,

    /// Redis server used for account locks instead of the in-process manager
    #[cfg(feature = "redis")]
    #[arg(long = "redis-url", value_name = "URL", help = "Take account locks in Redis at this URL")]
    pub redis_url: Option<String>,
}

/// Available processing strategies for replay
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; invalid ones are replaced by
    /// `BatchConfig::new` with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create an EngineConfig from CLI arguments
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::new(
            self.min_amount.unwrap_or(DEFAULT_MIN_AMOUNT),
            self.max_amount.unwrap_or(DEFAULT_MAX_AMOUNT),
            self.lock_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOCK_WAIT),
            self.lock_hold_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOCK_HOLD),
        )
    }
}
