//! Geospatial query benchmarking and feed seeding tool.
//!
//! Loads address data into PostgreSQL, times three ways of asking it for
//! nearby addresses, and fills feed/comment tables with synthetic posts
//! whose authors live near each other.
//!
//! ```bash
//! cargo run -p geoseed -- init
//! cargo run -p geoseed -- load addresses.csv --postal AT
//! cargo run -p geoseed -- select 11.4004554 47.2369399 --query spatial --within 5
//! cargo run -p geoseed -- seed --days 3 --seed 42
//! ```

mod cli;
mod commands;
mod load;
mod logging;
mod pg;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.effective_log_level(), cli.log_format) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let Cli {
        db, quiet, command, ..
    } = cli;
    match commands::run(command, &db, quiet).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
