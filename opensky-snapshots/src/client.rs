//! OpenSky REST access: OAuth2 client-credentials token and `/states/all`.
//!
//! Blocking `reqwest` client with one fixed request timeout. Every call is
//! a single attempt; retry policy belongs to whoever schedules the job.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use opensky_core::config::{BoundingBox, Config};
use opensky_core::states::parse_states;
use opensky_core::types::{FeedError, Result, StateResponse};

use crate::credentials::Credentials;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The two upstream calls an ingestion run makes.
///
/// Implemented by `OpenSkyClient`; tests substitute fakes.
pub trait FlightApi {
    /// Exchange client credentials for a bearer token.
    fn request_token(&self, creds: &Credentials) -> Result<String>;

    /// Fetch the current state vectors using a bearer token.
    fn fetch_states(&self, token: &str) -> Result<StateResponse>;
}

/// Token endpoint answer; only `access_token` is used.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct OpenSkyClient {
    token_url: String,
    states_url: String,
    bounds: Option<BoundingBox>,
    client: Client,
}

impl OpenSkyClient {
    pub fn new(token_url: &str, states_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedError::Config(format!("HTTP client: {e}")))?;

        Ok(OpenSkyClient {
            token_url: token_url.to_string(),
            states_url: states_url.to_string(),
            bounds: None,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            &config.api.token_url,
            &config.api.states_url,
            Duration::from_secs(config.api.timeout_secs),
        )?
        .with_bounds(config.bounds))
    }

    /// Restrict `/states/all` to a bounding box. `None` fetches everything.
    pub fn with_bounds(mut self, bounds: Option<BoundingBox>) -> Self {
        self.bounds = bounds;
        self
    }
}

impl FlightApi for OpenSkyClient {
    #[tracing::instrument(skip(self, creds))]
    fn request_token(&self, creds: &Credentials) -> Result<String> {
        trace!("requesting token from {}", self.token_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        let resp = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .map_err(|e| classify(e, "token exchange"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Rejected {
                status: status.as_u16(),
                url: self.token_url.clone(),
            });
        }

        let body = resp.text().map_err(|e| classify(e, "token exchange"))?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| FeedError::MalformedResponse(format!("token response: {e}")))?;

        debug!("token acquired, expires in {:?}s", token.expires_in);
        Ok(token.access_token)
    }

    #[tracing::instrument(skip(self, token))]
    fn fetch_states(&self, token: &str) -> Result<StateResponse> {
        trace!("fetching states from {}", self.states_url);

        let mut req = self.client.get(&self.states_url).bearer_auth(token);
        if let Some(bbox) = &self.bounds {
            req = req.query(&bbox.query());
        }
        let resp = req.send().map_err(|e| classify(e, "state fetch"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Rejected {
                status: status.as_u16(),
                url: self.states_url.clone(),
            });
        }

        let body = resp.text().map_err(|e| classify(e, "state fetch"))?;
        debug!("{} bytes of state data", body.len());
        parse_states(&body)
    }
}

/// Map a transport error onto the closed error kinds.
fn classify(err: reqwest::Error, call: &str) -> FeedError {
    if err.is_timeout() {
        FeedError::Timeout(format!("{call}: {err}"))
    } else if err.is_decode() || err.is_body() {
        FeedError::MalformedResponse(format!("{call}: {err}"))
    } else {
        FeedError::Connectivity(format!("{call}: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
