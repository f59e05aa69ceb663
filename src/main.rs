//! Account ledger replay CLI
//!
//! Replays balance use/cancel/query operations from a CSV file against
//! accounts seeded from another CSV file.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv operations.csv > accounts_out.csv
//! cargo run -- --accounts accounts.csv --strategy sync operations.csv
//! cargo run -- --accounts accounts.csv --strategy async --batch-size 2000 --max-concurrent 8 operations.csv
//! cargo run -- --accounts accounts.csv --ledger-out ledger.csv operations.csv
//! ```
//!
//! Final account states go to stdout; logs go to stderr (`RUST_LOG`,
//! `--json-logs`). Query rows report the record they found as `info` events,
//! so run with `RUST_LOG=info` to see them.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use std::process;

use account_ledger::{cli, telemetry};
use tracing::error;

fn main() {
    let args = cli::parse_args();
    telemetry::init(args.json_logs);

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut output) {
        error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
