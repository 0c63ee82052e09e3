//! SQLite persistence — WAL mode, identity + snapshot tables.
//!
//! Schema: aircraft_identity, snapshots. One identity row per ICAO address,
//! one snapshot row per observed state vector per ingestion run.
//!
//! `valid_trajectories` (first/last known position per aircraft) is derived
//! outside this crate; it is only read and its distance column updated here.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Result as SqlResult};
use tracing::{debug, trace};

use opensky_core::types::StateVector;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS aircraft_identity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    icao TEXT NOT NULL UNIQUE,
    call_sign TEXT,
    country_of_origin TEXT
);

CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    aircraft_id INTEGER NOT NULL REFERENCES aircraft_identity(id),
    sequence_position INTEGER,
    capture_timestamp INTEGER NOT NULL,
    longitude REAL,
    latitude REAL,
    altitude REAL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_aircraft ON snapshots(aircraft_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_capture ON snapshots(capture_timestamp);
"#;

pub const TRAJECTORY_TABLE: &str = "valid_trajectories";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite store shared by the ingestion and distance jobs.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path)?
        };
        Self::configure(conn)
    }

    /// Open a database that must already exist. Never creates the file.
    pub fn open_existing(path: &str) -> SqlResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    fn configure(conn: Connection) -> SqlResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode returns a row, so it cannot go through execute_batch
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get(0))?;
        trace!("journal_mode={mode}");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Database { conn })
    }

    /// Create the identity and snapshot tables if absent. Existing data is
    /// left untouched.
    pub fn ensure_schema(&self) -> SqlResult<()> {
        self.conn.execute_batch(SCHEMA)
    }

    /// True if a table or view with this name exists.
    pub fn has_table(&self, name: &str) -> SqlResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            params![name],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Upsert each aircraft and append one snapshot per state vector, all in
    /// one transaction. Any failure rolls the whole batch back.
    ///
    /// Identity rows are keyed by `icao` and written once: a known aircraft
    /// keeps its first `id`, call sign and country.
    pub fn persist_snapshots(
        &mut self,
        states: &[StateVector],
        capture_timestamp: i64,
    ) -> SqlResult<PersistSummary> {
        let mut summary = PersistSummary::default();
        if states.is_empty() {
            return Ok(summary);
        }

        let tx = self.conn.transaction()?;
        {
            let mut insert_aircraft = tx.prepare_cached(
                "INSERT OR IGNORE INTO aircraft_identity (icao, call_sign, country_of_origin)
                 VALUES (?1, ?2, ?3)",
            )?;
            let mut lookup =
                tx.prepare_cached("SELECT id FROM aircraft_identity WHERE icao = ?1")?;
            let mut insert_snapshot = tx.prepare_cached(
                "INSERT INTO snapshots
                 (aircraft_id, sequence_position, capture_timestamp, longitude, latitude, altitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for sv in states {
                let inserted = insert_aircraft.execute(params![
                    sv.icao24,
                    sv.callsign,
                    sv.origin_country
                ])?;
                if inserted > 0 {
                    summary.new_aircraft += 1;
                }

                let aircraft_id: i64 = lookup.query_row(params![sv.icao24], |r| r.get(0))?;

                insert_snapshot.execute(params![
                    aircraft_id,
                    sv.time_position,
                    capture_timestamp,
                    sv.longitude,
                    sv.latitude,
                    sv.baro_altitude,
                ])?;
                summary.snapshots += 1;
            }
        }
        tx.commit()?;

        debug!(
            "persisted {} snapshots ({} new aircraft) at {capture_timestamp}",
            summary.snapshots, summary.new_aircraft
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Trajectories
    // -----------------------------------------------------------------------

    /// Read every row of `valid_trajectories`.
    pub fn load_trajectories(&self) -> SqlResult<Vec<TrajectoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT aircraft_id, lat_start, lon_start, lat_end, lon_end, distance_start_to_end_km
             FROM valid_trajectories ORDER BY aircraft_id",
        )?;

        let rows = stmt.query_map([], |r| {
            Ok(TrajectoryRow {
                aircraft_id: r.get(0)?,
                lat_start: r.get(1)?,
                lon_start: r.get(2)?,
                lat_end: r.get(3)?,
                lon_end: r.get(4)?,
                distance_km: r.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// Write computed distances back by `aircraft_id`, in one transaction.
    /// Returns the number of rows updated.
    pub fn store_distances(&mut self, distances: &[(i64, f64)]) -> SqlResult<usize> {
        if distances.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE valid_trajectories SET distance_start_to_end_km = ?1
                 WHERE aircraft_id = ?2",
            )?;
            for (aircraft_id, km) in distances {
                updated += stmt.execute(params![km, aircraft_id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Trajectories with a computed distance, longest first.
    pub fn longest_trajectories(&self, limit: i64) -> SqlResult<Vec<DistanceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.aircraft_id, a.icao, a.call_sign, t.distance_start_to_end_km
             FROM valid_trajectories t
             LEFT JOIN aircraft_identity a ON a.id = t.aircraft_id
             WHERE t.distance_start_to_end_km IS NOT NULL
             ORDER BY t.distance_start_to_end_km DESC, t.aircraft_id
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |r| {
            Ok(DistanceRow {
                aircraft_id: r.get(0)?,
                icao: r.get(1)?,
                call_sign: r.get(2)?,
                distance_km: r.get(3)?,
            })
        })?;
        rows.collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_aircraft(&self, icao: &str) -> SqlResult<Option<AircraftRow>> {
        self.conn
            .query_row(
                "SELECT id, icao, call_sign, country_of_origin
                 FROM aircraft_identity WHERE icao = ?1",
                params![icao],
                |r| {
                    Ok(AircraftRow {
                        id: r.get(0)?,
                        icao: r.get(1)?,
                        call_sign: r.get(2)?,
                        country_of_origin: r.get(3)?,
                    })
                },
            )
            .optional()
    }

    /// All snapshots for one aircraft, oldest first.
    pub fn snapshots_for(&self, aircraft_id: i64) -> SqlResult<Vec<SnapshotRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, aircraft_id, sequence_position, capture_timestamp, longitude, latitude, altitude
             FROM snapshots WHERE aircraft_id = ?1
             ORDER BY capture_timestamp ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![aircraft_id], |r| {
            Ok(SnapshotRow {
                id: r.get(0)?,
                aircraft_id: r.get(1)?,
                sequence_position: r.get(2)?,
                capture_timestamp: r.get(3)?,
                longitude: r.get(4)?,
                latitude: r.get(5)?,
                altitude: r.get(6)?,
            })
        })?;
        rows.collect()
    }

    pub fn count_aircraft(&self) -> SqlResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM aircraft_identity", [], |r| r.get(0))
    }

    pub fn count_snapshots(&self) -> SqlResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))
    }

    pub fn stats(&self) -> SqlResult<DbStats> {
        Ok(DbStats {
            aircraft: self.count_aircraft()?,
            snapshots: self.count_snapshots()?,
            capture_runs: self.conn.query_row(
                "SELECT COUNT(DISTINCT capture_timestamp) FROM snapshots",
                [],
                |r| r.get(0),
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Counts from one `persist_snapshots` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistSummary {
    pub new_aircraft: usize,
    pub snapshots: usize,
}

#[derive(Debug)]
pub struct AircraftRow {
    pub id: i64,
    pub icao: String,
    pub call_sign: Option<String>,
    pub country_of_origin: Option<String>,
}

#[derive(Debug)]
pub struct SnapshotRow {
    pub id: i64,
    pub aircraft_id: i64,
    pub sequence_position: Option<i64>,
    pub capture_timestamp: i64,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
}

/// One row of `valid_trajectories`. Coordinates may be null when the view
/// could not find a positioned snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRow {
    pub aircraft_id: i64,
    pub lat_start: Option<f64>,
    pub lon_start: Option<f64>,
    pub lat_end: Option<f64>,
    pub lon_end: Option<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Debug)]
pub struct DistanceRow {
    pub aircraft_id: i64,
    pub icao: Option<String>,
    pub call_sign: Option<String>,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    pub aircraft: i64,
    pub snapshots: i64,
    pub capture_runs: i64,
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
