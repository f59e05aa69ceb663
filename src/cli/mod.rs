// CLI module
// Command-line interface, argument parsing and replay wiring

mod args;

pub use args::{CliArgs, StrategyType};

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::core::{InMemoryLockManager, LockManager, Replayer};
use crate::io::{read_accounts, write_ledger_csv};
use crate::strategy::create_strategy;

/// Parse command-line arguments using clap
///
/// If parsing fails (invalid arguments, missing required arguments, or
/// `--help`), clap prints an error or help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

fn lock_manager(args: &CliArgs) -> Result<Arc<dyn LockManager>, String> {
    #[cfg(feature = "redis")]
    if let Some(url) = &args.redis_url {
        let manager = crate::core::lock::RedisLockManager::new(url)
            .map_err(|e| format!("Failed to configure redis lock manager: {}", e))?;
        return Ok(Arc::new(manager));
    }

    #[cfg(not(feature = "redis"))]
    let _ = args;

    Ok(Arc::new(InMemoryLockManager::new()))
}

/// Run a replay as described by `args`, writing account states to `output`
///
/// # Returns
///
/// * `Ok(())` if the replay completed
/// * `Err(String)` on fatal errors: unreadable accounts or operations file,
///   unwritable ledger output
pub fn run(args: &CliArgs, output: &mut dyn std::io::Write) -> Result<(), String> {
    let accounts = read_accounts(&args.accounts_file)?;
    info!(accounts = accounts.len(), "accounts loaded");

    let replayer = Replayer::new(accounts, lock_manager(args)?, args.to_engine_config());

    let config = match args.strategy {
        StrategyType::Async => Some(args.to_batch_config()),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(args.strategy.clone(), config);

    strategy.process(&replayer, &args.input_file, output)?;

    if let Some(path) = &args.ledger_out {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))?;
        let records = replayer.ledger_records();
        write_ledger_csv(&records, &mut BufWriter::new(file))?;
        info!(records = records.len(), path = %path.display(), "ledger written");
    }

    Ok(())
}
