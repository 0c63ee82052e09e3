//! compute-distances: fill in start-to-end distance for every trajectory.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use opensky_core::types::FeedError;
use opensky_snapshots::db::Database;
use opensky_snapshots::pipeline::{self, DistanceOutcome, RunError};
use opensky_snapshots::{logging, report};

#[derive(Parser)]
#[command(
    name = "compute-distances",
    version,
    about = "Compute great-circle distance between first and last position per aircraft"
)]
struct Cli {
    /// SQLite database path
    db_path: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    println!("Using database: {}", cli.db_path);
    ExitCode::from(run(&cli))
}

fn run(cli: &Cli) -> u8 {
    if !Path::new(&cli.db_path).exists() {
        return report::failure(&FeedError::NotFound(cli.db_path.clone()).into());
    }

    let mut db = match Database::open_existing(&cli.db_path) {
        Ok(db) => db,
        Err(e) => return report::failure(&RunError::from(e)),
    };

    let outcome = match pipeline::compute_distances(&mut db) {
        Ok(outcome) => outcome,
        Err(e) => return report::failure(&e),
    };
    report::distance_outcome(&outcome);

    if let DistanceOutcome::Computed { .. } = outcome {
        match db.longest_trajectories(report::LONGEST_SHOWN) {
            Ok(rows) => report::longest(&rows),
            Err(e) => return report::failure(&RunError::from(e)),
        }
    }
    0
}
