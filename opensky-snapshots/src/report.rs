//! Operator-facing status lines for both jobs.

use comfy_table::{Cell, Table};

use opensky_core::types::FeedError;

use crate::db::{DbStats, DistanceRow};
use crate::pipeline::{DistanceOutcome, IngestOutcome, RunError};

/// Rows shown in the summary table after a distance pass.
pub const LONGEST_SHOWN: i64 = 10;

pub fn ingest_outcome(outcome: &IngestOutcome, country: &str) {
    match outcome {
        IngestOutcome::NoStates => {
            println!("Upstream returned no state vectors; nothing to store.");
        }
        IngestOutcome::NothingToPersist { fetched } => {
            println!("Fetched {fetched} state vectors, none from {country}; nothing to store.");
        }
        IngestOutcome::Persisted(s) => {
            println!("Fetched {} state vectors, {} from {country}.", s.fetched, s.retained);
            println!(
                "Stored {} snapshots at {} ({} new aircraft).",
                s.snapshots, s.capture_timestamp, s.new_aircraft
            );
        }
    }
}

pub fn stats(stats: &DbStats, db_path: &str) {
    println!();
    println!("Database: {db_path}");
    println!("  Aircraft:      {}", stats.aircraft);
    println!("  Snapshots:     {}", stats.snapshots);
    println!("  Capture runs:  {}", stats.capture_runs);
    println!();
}

pub fn distance_outcome(outcome: &DistanceOutcome) {
    match outcome {
        DistanceOutcome::NothingToCompute => {
            println!("valid_trajectories is empty; no trajectories to process.");
        }
        DistanceOutcome::Computed { updated, skipped } => {
            println!("Stored start-to-end distance for {updated} trajectories.");
            if *skipped > 0 {
                println!("Skipped {skipped} trajectories with missing coordinates.");
            }
        }
    }
}

pub fn longest(rows: &[DistanceRow]) {
    if rows.is_empty() {
        return;
    }

    println!();
    let mut table = Table::new();
    table.set_header(vec!["Aircraft", "ICAO", "Callsign", "Distance (km)"]);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.aircraft_id),
            Cell::new(row.icao.as_deref().unwrap_or("-")),
            Cell::new(row.call_sign.as_deref().map(str::trim).unwrap_or("-")),
            Cell::new(format!("{:.2}", row.distance_km)),
        ]);
    }

    println!("{table}");
}

/// Print a failure line and return the exit code to use.
pub fn failure(err: &RunError) -> u8 {
    let line = match err {
        RunError::Feed(FeedError::Timeout(msg)) => {
            format!("Request timed out and was cancelled ({msg}).")
        }
        RunError::Feed(FeedError::Connectivity(msg)) => {
            format!("Could not reach OpenSky Network; check the connection or firewall ({msg}).")
        }
        RunError::Feed(FeedError::MalformedResponse(msg)) => {
            format!("Could not read flight data from the response ({msg}); nothing stored.")
        }
        other => format!("Error: {other}"),
    };
    println!("{line}");
    err.exit_code()
}
