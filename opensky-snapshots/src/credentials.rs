//! OpenSky API client credentials, read from `credentials.json`.
//!
//! ```json
//! {"clientId": "...", "clientSecret": "..."}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;

use opensky_core::types::{FeedError, Result};

pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

// Keep the secret out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// `credentials.json` in the directory of the running executable.
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CREDENTIALS_FILE)
}

/// Load credentials. A missing file is `NotFound`; anything unreadable or
/// incomplete is a `Config` error.
pub fn load(path: &Path) -> Result<Credentials> {
    trace!("loading credentials from {}", path.display());

    if !path.exists() {
        return Err(FeedError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text).map_err(|e| match e {
        FeedError::Config(msg) => FeedError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn parse(text: &str) -> Result<Credentials> {
    let creds: Credentials =
        serde_json::from_str(text).map_err(|e| FeedError::Config(e.to_string()))?;

    if creds.client_id.trim().is_empty() || creds.client_secret.trim().is_empty() {
        return Err(FeedError::Config("clientId and clientSecret must not be empty".into()));
    }
    Ok(creds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
