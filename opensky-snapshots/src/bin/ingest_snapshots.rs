//! ingest-snapshots: one ingestion run against an SQLite store.
//!
//! Authenticates with OpenSky, fetches the current state vectors, keeps the
//! configured country's aircraft, and appends one snapshot per aircraft.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use opensky_core::config;
use opensky_core::filter::NationalityFilter;
use opensky_snapshots::client::OpenSkyClient;
use opensky_snapshots::db::Database;
use opensky_snapshots::pipeline::{self, IngestOutcome};
use opensky_snapshots::{credentials, logging, report};

#[derive(Parser)]
#[command(
    name = "ingest-snapshots",
    version,
    about = "Store live OpenSky snapshots for one country's aircraft"
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
    let config = config::load_config();

    let creds_path = config
        .credentials
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(credentials::default_path);
    let creds = match credentials::load(&creds_path) {
        Ok(c) => c,
        Err(e) => return report::failure(&e.into()),
    };

    let api = match OpenSkyClient::from_config(&config) {
        Ok(api) => api,
        Err(e) => return report::failure(&e.into()),
    };

    let filter = NationalityFilter::new(&config.filter.country);
    let open_store = || Database::open(&cli.db_path);
    let outcome = match pipeline::ingest(&api, open_store, &creds, &filter, pipeline::now_epoch()) {
        Ok(outcome) => outcome,
        Err(e) => return report::failure(&e),
    };
    report::ingest_outcome(&outcome, &filter.country);

    if let IngestOutcome::Persisted(summary) = outcome {
        report::stats(&summary.totals, &cli.db_path);
    }
    0
}
