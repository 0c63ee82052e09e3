//! Configuration file management for opensky-snapshots.
//!
//! Reads `~/.opensky-snapshots/config.yaml` with API endpoints, request
//! timeout, target country, credential path, and an optional bounding box.

use std::path::PathBuf;

use crate::filter::DEFAULT_COUNTRY;

pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
pub const DEFAULT_STATES_URL: &str = "https://opensky-network.org/api/states/all";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub filter: FilterConfig,
    pub credentials: CredentialsConfig,
    pub bounds: Option<BoundingBox>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub token_url: String,
    pub states_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    /// `None` means `credentials.json` next to the executable.
    pub path: Option<String>,
}

/// Geographic query filter for `/states/all`, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lamin: f64,
    pub lomin: f64,
    pub lamax: f64,
    pub lomax: f64,
}

impl BoundingBox {
    /// Query parameters in the order the API documents them.
    pub fn query(&self) -> [(&'static str, String); 4] {
        [
            ("lamin", self.lamin.to_string()),
            ("lomin", self.lomin.to_string()),
            ("lamax", self.lamax.to_string()),
            ("lomax", self.lomax.to_string()),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                token_url: DEFAULT_TOKEN_URL.into(),
                states_url: DEFAULT_STATES_URL.into(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            filter: FilterConfig {
                country: DEFAULT_COUNTRY.into(),
            },
            credentials: CredentialsConfig { path: None },
            bounds: None,
        }
    }
}

/// Get the config directory path (`~/.opensky-snapshots/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".opensky-snapshots")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.opensky-snapshots/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text)
}

/// Partial bounding box while parsing; only complete boxes are applied.
#[derive(Default)]
struct BoundsDraft {
    lamin: Option<f64>,
    lomin: Option<f64>,
    lamax: Option<f64>,
    lomax: Option<f64>,
}

impl BoundsDraft {
    fn finish(self) -> Option<BoundingBox> {
        Some(BoundingBox {
            lamin: self.lamin?,
            lomin: self.lomin?,
            lamax: self.lamax?,
            lomax: self.lomax?,
        })
    }
}

/// Parse simple YAML-like config text.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut bounds = BoundsDraft::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                current_section = if val.is_empty() {
                    Some(key.to_string())
                } else {
                    None
                };
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "api" => match key {
                        "token_url" => {
                            if let Some(v) = parse_string_value(val) {
                                config.api.token_url = v;
                            }
                        }
                        "states_url" => {
                            if let Some(v) = parse_string_value(val) {
                                config.api.states_url = v;
                            }
                        }
                        "timeout_secs" => {
                            if let Some(v) = val.parse::<u64>().ok().filter(|v| *v > 0) {
                                config.api.timeout_secs = v;
                            }
                        }
                        _ => {}
                    },
                    "filter" => {
                        if key == "country" {
                            if let Some(v) = parse_string_value(val) {
                                config.filter.country = v;
                            }
                        }
                    }
                    "credentials" => {
                        if key == "path" {
                            config.credentials.path = parse_string_value(val);
                        }
                    }
                    "bounds" => match key {
                        "lamin" => bounds.lamin = parse_float_value(val),
                        "lomin" => bounds.lomin = parse_float_value(val),
                        "lamax" => bounds.lamax = parse_float_value(val),
                        "lomax" => bounds.lomax = parse_float_value(val),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    config.bounds = bounds.finish();
    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
