//! Client configuration.
//!
//! Provides `ClientConfig`, the explicitly constructed configuration handed to
//! the API client and the local store. Values come from the environment with
//! hard-coded local/production fallbacks for the API base URL.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

pub const API_URL_ENV: &str = "OHS_API_URL";
pub const ENVIRONMENT_ENV: &str = "OHS_ENV";
pub const DB_PATH_ENV: &str = "OHS_DB_PATH";
pub const REQUEST_TIMEOUT_ENV: &str = "OHS_REQUEST_TIMEOUT_SECS";

pub const LOCAL_API_BASE_URL: &str = "http://localhost:5000/api";
pub const PRODUCTION_API_BASE_URL: &str = "https://api.ohs-platform.com/api";

/// Runtime configuration for the API client and local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against, without a trailing slash.
    pub api_base_url: String,
    /// Local database file. `None` keeps the store in memory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Per-request timeout. `None` keeps the HTTP client's default.
    #[serde(default)]
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Build a configuration for an explicit base URL.
    pub fn new(api_base_url: impl AsRef<str>) -> Result<Self, String> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.as_ref())?,
            database_path: None,
            request_timeout: None,
        })
    }

    /// Resolve configuration from `OHS_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        let production = std::env::var(ENVIRONMENT_ENV)
            .is_ok_and(|value| value.trim().eq_ignore_ascii_case("production"));
        let api_base_url = resolve_api_base_url(std::env::var(API_URL_ENV).ok(), production)?;
        let database_path = normalize_text_option(std::env::var(DB_PATH_ENV).ok()).map(PathBuf::from);
        let request_timeout = parse_timeout_secs(std::env::var(REQUEST_TIMEOUT_ENV).ok())?;

        Ok(Self {
            api_base_url,
            database_path,
            request_timeout,
        })
    }

    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Join an endpoint path onto the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim();
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_base_url, endpoint)
        } else {
            format!("{}/{}", self.api_base_url, endpoint)
        }
    }
}

/// Pick the API base URL: explicit value first, then the environment fallback.
pub fn resolve_api_base_url(explicit: Option<String>, production: bool) -> Result<String, String> {
    match normalize_text_option(explicit) {
        Some(url) => normalize_base_url(&url),
        None if production => Ok(PRODUCTION_API_BASE_URL.to_string()),
        None => Ok(LOCAL_API_BASE_URL.to_string()),
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err("API base URL must not be empty".to_string());
    }
    if !is_http_url(&base) {
        return Err("API base URL must include http:// or https://".to_string());
    }
    Ok(base)
}

fn parse_timeout_secs(raw: Option<String>) -> Result<Option<Duration>, String> {
    let Some(raw) = normalize_text_option(raw) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|error| format!("{REQUEST_TIMEOUT_ENV} must be a whole number of seconds: {error}"))
}
