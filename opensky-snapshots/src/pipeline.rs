//! The two batch runs.
//!
//! - `ingest`: token → fetch → nationality filter → persist (one commit).
//! - `compute_distances`: `valid_trajectories` → great-circle distance →
//!   write back (one commit).
//!
//! Both take their collaborators as parameters; nothing here is global.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use opensky_core::filter::NationalityFilter;
use opensky_core::geo::{trajectory_distance_km, GeoPoint};
use opensky_core::types::FeedError;

use crate::client::FlightApi;
use crate::credentials::Credentials;
use crate::db::{Database, DbStats, TrajectoryRow, TRAJECTORY_TABLE};

/// Everything that can end a run early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl RunError {
    /// Process exit code for this failure.
    ///
    /// 0 for data errors (the run ends cleanly without writing), 2 for
    /// configuration problems, 1 for transport and database failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Feed(e) if e.is_data() => 0,
            RunError::Feed(e) if e.is_transport() => 1,
            RunError::Feed(_) => 2,
            RunError::Database(_) => 1,
        }
    }
}

/// Wall-clock seconds since the epoch, shared by every snapshot of a run.
pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub retained: usize,
    pub new_aircraft: usize,
    pub snapshots: usize,
    pub capture_timestamp: i64,
    /// Store totals after the commit.
    pub totals: DbStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Upstream returned an empty state list.
    NoStates,
    /// States were fetched but none matched the target country.
    NothingToPersist { fetched: usize },
    Persisted(IngestSummary),
}

/// Run one ingestion pass.
///
/// `open_store` is only called once the fetch has succeeded and at least one
/// record survived the filter, so failed or empty runs never create the
/// database file. The tables are created on that first write.
pub fn ingest<A, F>(
    api: &A,
    open_store: F,
    creds: &Credentials,
    filter: &NationalityFilter,
    capture_timestamp: i64,
) -> Result<IngestOutcome, RunError>
where
    A: FlightApi + ?Sized,
    F: FnOnce() -> rusqlite::Result<Database>,
{
    let token = api.request_token(creds)?;
    debug!("authenticated as {}", creds.client_id);

    let response = api.fetch_states(&token)?;
    let fetched = response.states.len();
    info!("fetched {fetched} state vectors (upstream time {:?})", response.time);

    if fetched == 0 {
        return Ok(IngestOutcome::NoStates);
    }

    let retained = filter.retain(response.states);
    debug!("{} of {fetched} from {}", retained.len(), filter.country);
    if retained.is_empty() {
        return Ok(IngestOutcome::NothingToPersist { fetched });
    }

    let mut db = open_store()?;
    db.ensure_schema()?;
    let persisted = db.persist_snapshots(&retained, capture_timestamp)?;
    let totals = db.stats()?;

    Ok(IngestOutcome::Persisted(IngestSummary {
        fetched,
        retained: retained.len(),
        new_aircraft: persisted.new_aircraft,
        snapshots: persisted.snapshots,
        capture_timestamp,
        totals,
    }))
}

// ---------------------------------------------------------------------------
// Distance pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceOutcome {
    /// `valid_trajectories` has no rows.
    NothingToCompute,
    /// `skipped` rows had a null coordinate and were left untouched.
    Computed { updated: usize, skipped: usize },
}

/// Compute and store the start-to-end distance of every trajectory.
pub fn compute_distances(db: &mut Database) -> Result<DistanceOutcome, RunError> {
    if !db.has_table(TRAJECTORY_TABLE)? {
        return Err(FeedError::NotFound(format!("table {TRAJECTORY_TABLE}")).into());
    }

    let rows = db.load_trajectories()?;
    if rows.is_empty() {
        return Ok(DistanceOutcome::NothingToCompute);
    }

    let mut distances = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in &rows {
        match endpoints(row) {
            Some((start, end)) => {
                distances.push((row.aircraft_id, trajectory_distance_km(start, end)))
            }
            None => {
                debug!("aircraft {} has no complete trajectory", row.aircraft_id);
                skipped += 1;
            }
        }
    }

    let updated = db.store_distances(&distances)?;
    Ok(DistanceOutcome::Computed { updated, skipped })
}

fn endpoints(row: &TrajectoryRow) -> Option<(GeoPoint, GeoPoint)> {
    Some((
        GeoPoint::new(row.lat_start?, row.lon_start?),
        GeoPoint::new(row.lat_end?, row.lon_end?),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use tempfile::TempDir;

    use opensky_core::states::parse_states;
    use opensky_core::types::{Result as FeedResult, StateResponse};

    use super::*;
    use crate::db::test_support::{create_trajectories, derive_trajectories};

    const STATES: &str = r#"{
        "time": 1700000000,
        "states": [
            ["0d0abc", "AMX401  ", "Mexico", 1699999990, 1699999995, -99.1332, 19.4326, 10972.8, false, 230.1, 12.5, 0.0, null, 11125.2, "1200", false, 0],
            ["a1b2c3", "UAL12   ", "United States", 1699999991, 1699999995, -87.9, 41.9, 3000.0, false, 120.0, 90.0, 0.0, null, 3100.0, null, false, 0],
            ["0d0def", null, "Mexico", null, 1699999995, null, null, null, true, 0.0, 0.0, 0.0, null, null, null, false, 0]
        ]
    }"#;

    #[derive(Default)]
    struct FakeApi {
        body: String,
        token_error: Option<fn() -> FeedError>,
        fetch_error: Option<fn() -> FeedError>,
        tokens_seen: RefCell<Vec<String>>,
    }

    impl FakeApi {
        fn with_body(body: &str) -> Self {
            FakeApi {
                body: body.to_string(),
                ..Default::default()
            }
        }
    }

    impl FlightApi for FakeApi {
        fn request_token(&self, creds: &Credentials) -> FeedResult<String> {
            match self.token_error {
                Some(err) => Err(err()),
                None => Ok(format!("tok-{}", creds.client_id)),
            }
        }

        fn fetch_states(&self, token: &str) -> FeedResult<StateResponse> {
            self.tokens_seen.borrow_mut().push(token.to_string());
            match self.fetch_error {
                Some(err) => Err(err()),
                None => parse_states(&self.body),
            }
        }
    }

    fn creds() -> Credentials {
        Credentials {
            client_id: "alice".into(),
            client_secret: "s3cret".into(),
        }
    }

    fn mexico() -> NationalityFilter {
        NationalityFilter::new("Mexico")
    }

    fn memory_db() -> Database {
        Database::open_memory().unwrap()
    }

    /// On-disk store under a temp dir that the first write creates.
    struct TempStore {
        _dir: TempDir,
        path: String,
    }

    impl TempStore {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("data").join("flights.db");
            TempStore {
                path: path.to_str().unwrap().to_string(),
                _dir: dir,
            }
        }

        fn opener(&self) -> impl FnOnce() -> rusqlite::Result<Database> + '_ {
            move || Database::open(&self.path)
        }

        fn exists(&self) -> bool {
            Path::new(&self.path).exists()
        }

        fn reopen(&self) -> Database {
            Database::open_existing(&self.path).unwrap()
        }
    }

    #[test]
    fn test_ingest_persists_target_country() {
        let api = FakeApi::with_body(STATES);
        let store = TempStore::new();

        let outcome = ingest(&api, store.opener(), &creds(), &mexico(), 1_700_000_100).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Persisted(IngestSummary {
                fetched: 3,
                retained: 2,
                new_aircraft: 2,
                snapshots: 2,
                capture_timestamp: 1_700_000_100,
                totals: DbStats {
                    aircraft: 2,
                    snapshots: 2,
                    capture_runs: 1,
                },
            })
        );
        assert_eq!(api.tokens_seen.borrow().as_slice(), ["tok-alice"]);

        let db = store.reopen();
        assert!(db.get_aircraft("a1b2c3").unwrap().is_none());

        let ac = db.get_aircraft("0d0abc").unwrap().unwrap();
        assert_eq!(ac.call_sign.as_deref(), Some("AMX401  "));
        let snaps = db.snapshots_for(ac.id).unwrap();
        assert_eq!(snaps[0].sequence_position, Some(1699999990));
        assert_eq!(snaps[0].longitude, Some(-99.1332));
        assert_eq!(snaps[0].latitude, Some(19.4326));
        assert_eq!(snaps[0].altitude, Some(10972.8));

        let grounded = db.get_aircraft("0d0def").unwrap().unwrap();
        let snaps = db.snapshots_for(grounded.id).unwrap();
        assert!(snaps[0].latitude.is_none());
        assert!(snaps[0].sequence_position.is_none());
    }

    #[test]
    fn test_repeated_runs_accumulate_snapshots() {
        let api = FakeApi::with_body(STATES);
        let store = TempStore::new();
        let runs = 4;

        for run in 0..runs {
            ingest(&api, store.opener(), &creds(), &mexico(), 1_700_000_000 + run).unwrap();
        }

        let stats = store.reopen().stats().unwrap();
        assert_eq!(stats.aircraft, 2);
        assert_eq!(stats.snapshots, 2 * runs);
        assert_eq!(stats.capture_runs, runs);
    }

    #[test]
    fn test_missing_states_writes_nothing() {
        let api = FakeApi::with_body(r#"{"time": 1700000000}"#);
        let store = TempStore::new();

        let err = ingest(&api, store.opener(), &creds(), &mexico(), 1).unwrap_err();
        assert_eq!(err.exit_code(), 0);
        assert!(matches!(err, RunError::Feed(FeedError::MalformedResponse(_))));
        assert!(!store.exists());
    }

    #[test]
    fn test_empty_states() {
        let store = TempStore::new();
        for body in [r#"{"time": 1, "states": []}"#, r#"{"time": 1, "states": null}"#] {
            let api = FakeApi::with_body(body);
            let outcome = ingest(&api, store.opener(), &creds(), &mexico(), 1).unwrap();
            assert_eq!(outcome, IngestOutcome::NoStates);
        }
        assert!(!store.exists());
    }

    #[test]
    fn test_no_match_is_nothing_to_persist() {
        let api = FakeApi::with_body(STATES);
        let store = TempStore::new();
        let peru = NationalityFilter::new("Peru");
        let outcome = ingest(&api, store.opener(), &creds(), &peru, 1).unwrap();
        assert_eq!(outcome, IngestOutcome::NothingToPersist { fetched: 3 });
        assert!(!store.exists());
    }

    #[test]
    fn test_token_timeout_aborts_before_fetch() {
        let api = FakeApi {
            body: STATES.into(),
            token_error: Some(|| FeedError::Timeout("token exchange".into())),
            ..Default::default()
        };
        let store = TempStore::new();

        let err = ingest(&api, store.opener(), &creds(), &mexico(), 1).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(api.tokens_seen.borrow().is_empty());
        assert!(!store.exists());
    }

    #[test]
    fn test_unreachable_token_endpoint() {
        let api = FakeApi {
            token_error: Some(|| FeedError::Connectivity("token exchange".into())),
            ..Default::default()
        };
        let store = TempStore::new();
        let err = ingest(&api, store.opener(), &creds(), &mexico(), 1).unwrap_err();
        assert!(matches!(err, RunError::Feed(FeedError::Connectivity(_))));
        assert!(!store.exists());
    }

    #[test]
    fn test_fetch_timeout_leaves_no_store() {
        let api = FakeApi {
            fetch_error: Some(|| FeedError::Timeout("state fetch".into())),
            ..Default::default()
        };
        let store = TempStore::new();
        let err = ingest(&api, store.opener(), &creds(), &mexico(), 1).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(!store.exists());
        assert!(!Path::new(&store.path).parent().unwrap().exists());
    }

    #[test]
    fn test_store_open_failure_is_database_error() {
        let api = FakeApi::with_body(STATES);
        let err = ingest(
            &api,
            || Err(rusqlite::Error::InvalidQuery),
            &creds(),
            &mexico(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Database(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunError::from(FeedError::NotFound("x".into())).exit_code(), 2);
        assert_eq!(RunError::from(FeedError::Config("x".into())).exit_code(), 2);
        assert_eq!(
            RunError::from(FeedError::Rejected {
                status: 500,
                url: "x".into()
            })
            .exit_code(),
            1
        );
        assert_eq!(
            RunError::from(rusqlite::Error::QueryReturnedNoRows).exit_code(),
            1
        );
    }

    // -- distance pass ------------------------------------------------------

    fn trajectory_db(rows: &[(i64, Option<f64>, Option<f64>, Option<f64>, Option<f64>)]) -> Database {
        let db = memory_db();
        db.ensure_schema().unwrap();
        create_trajectories(&db, rows);
        db
    }

    fn distance_of(db: &Database, aircraft_id: i64) -> Option<f64> {
        db.load_trajectories()
            .unwrap()
            .into_iter()
            .find(|r| r.aircraft_id == aircraft_id)
            .and_then(|r| r.distance_km)
    }

    #[test]
    fn test_known_pair() {
        let mut db = trajectory_db(&[(1, Some(19.4326), Some(-99.1332), Some(40.7128), Some(-74.0060))]);
        let outcome = compute_distances(&mut db).unwrap();
        assert_eq!(
            outcome,
            DistanceOutcome::Computed {
                updated: 1,
                skipped: 0
            }
        );
        let d = distance_of(&db, 1).unwrap();
        assert_eq!(d, 3359.38);
        assert!((d - 3362.89).abs() < 5.0);
    }

    #[test]
    fn test_degenerate_trajectory_is_zero() {
        let mut db = trajectory_db(&[(7, Some(19.4326), Some(-99.1332), Some(19.4326), Some(-99.1332))]);
        compute_distances(&mut db).unwrap();
        assert_eq!(distance_of(&db, 7), Some(0.0));
    }

    #[test]
    fn test_swapped_endpoints_match() {
        let mut db = trajectory_db(&[
            (1, Some(19.4326), Some(-99.1332), Some(40.7128), Some(-74.0060)),
            (2, Some(40.7128), Some(-74.0060), Some(19.4326), Some(-99.1332)),
            (3, Some(0.0), Some(0.0), Some(0.0), Some(180.0)),
        ]);
        compute_distances(&mut db).unwrap();
        assert_eq!(distance_of(&db, 1), distance_of(&db, 2));

        for row in db.load_trajectories().unwrap() {
            let d = row.distance_km.unwrap();
            assert!((0.0..=20015.0).contains(&d), "out of range: {d}");
        }
    }

    #[test]
    fn test_null_coordinates_skipped() {
        let mut db = trajectory_db(&[
            (1, Some(19.4326), Some(-99.1332), Some(40.7128), Some(-74.0060)),
            (2, None, None, Some(40.7128), Some(-74.0060)),
        ]);
        let outcome = compute_distances(&mut db).unwrap();
        assert_eq!(
            outcome,
            DistanceOutcome::Computed {
                updated: 1,
                skipped: 1
            }
        );
        assert!(distance_of(&db, 2).is_none());
    }

    #[test]
    fn test_empty_trajectories_is_noop() {
        let mut db = trajectory_db(&[]);
        assert_eq!(
            compute_distances(&mut db).unwrap(),
            DistanceOutcome::NothingToCompute
        );
    }

    #[test]
    fn test_missing_trajectory_table() {
        let mut db = memory_db();
        let err = compute_distances(&mut db).unwrap_err();
        assert!(matches!(err, RunError::Feed(FeedError::NotFound(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_ingest_then_compute() {
        let first = r#"{"time": 1, "states": [
            ["0d0abc", "AMX401  ", "Mexico", 1, 1, -99.1332, 19.4326, 2000.0]
        ]}"#;
        let second = r#"{"time": 2, "states": [
            ["0d0abc", "AMX401  ", "Mexico", 2, 2, -74.0060, 40.7128, 11000.0]
        ]}"#;

        let store = TempStore::new();
        ingest(&FakeApi::with_body(first), store.opener(), &creds(), &mexico(), 100).unwrap();
        ingest(&FakeApi::with_body(second), store.opener(), &creds(), &mexico(), 200).unwrap();
        let mut db = store.reopen();
        derive_trajectories(&db);

        compute_distances(&mut db).unwrap();
        let longest = db.longest_trajectories(5).unwrap();
        assert_eq!(longest.len(), 1);
        assert_eq!(longest[0].icao.as_deref(), Some("0d0abc"));
        assert_eq!(longest[0].distance_km, 3359.38);
    }

    #[test]
    fn test_now_epoch_is_recent() {
        assert!(now_epoch() > 1_600_000_000);
    }
}
