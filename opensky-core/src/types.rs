//! Shared types and the error enum for opensky-core.

use thiserror::Error;

/// All errors produced while talking to the upstream API or reading local
/// configuration.
///
/// The upstream kinds (`Timeout`, `Connectivity`, `Rejected`,
/// `MalformedResponse`) are closed so callers can branch on them directly.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connectivity(String),
    #[error("upstream rejected the request with HTTP {status}: {url}")]
    Rejected { status: u16, url: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Network-level failure: the run must abort, nothing is retried.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FeedError::Timeout(_) | FeedError::Connectivity(_) | FeedError::Rejected { .. }
        )
    }

    /// Upstream answered, but with data we cannot use.
    pub fn is_data(&self) -> bool {
        matches!(self, FeedError::MalformedResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

// ---------------------------------------------------------------------------
// State vectors
// ---------------------------------------------------------------------------

/// One aircraft as published by the `/states/all` endpoint.
///
/// Only the fields this pipeline persists are kept. Position and altitude
/// are optional upstream, so they stay optional here.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    /// 24-bit transponder address, lowercase hex as sent by OpenSky.
    pub icao24: String,
    /// Call sign, space padded upstream. Kept verbatim.
    pub callsign: Option<String>,
    pub origin_country: String,
    /// Unix time of the last position update.
    pub time_position: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Barometric altitude in meters.
    pub baro_altitude: Option<f64>,
}

/// Top-level `/states/all` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StateResponse {
    pub time: Option<i64>,
    pub states: Vec<StateVector>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(FeedError::Timeout("token".into()).is_transport());
        assert!(FeedError::Connectivity("dns".into()).is_transport());
        assert!(FeedError::Rejected {
            status: 401,
            url: "x".into()
        }
        .is_transport());
        assert!(!FeedError::MalformedResponse("no states".into()).is_transport());

        assert!(FeedError::MalformedResponse("no states".into()).is_data());
        assert!(!FeedError::NotFound("credentials.json".into()).is_data());
    }

    #[test]
    fn test_error_display() {
        let err = FeedError::Rejected {
            status: 403,
            url: "https://opensky-network.org/api/states/all".into(),
        };
        assert_eq!(
            err.to_string(),
            "upstream rejected the request with HTTP 403: https://opensky-network.org/api/states/all"
        );
    }
}
