//! opensky-snapshots: OpenSky ingestion and trajectory post-processing.
//!
//! Two batch jobs share one SQLite store:
//! - `ingest-snapshots` authenticates, fetches live state vectors, keeps one
//!   country's aircraft, and appends a snapshot per aircraft.
//! - `compute-distances` fills in start-to-end distance for each trajectory.

pub mod client;
pub mod credentials;
pub mod db;
pub mod logging;
pub mod pipeline;
pub mod report;
