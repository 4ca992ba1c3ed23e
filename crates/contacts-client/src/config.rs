//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use contacts_shared::constants::{
    API_BASE_PATH, DEFAULT_HTTP_PORT, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the contact API, including the `/api` prefix.
    /// Env: `CONTACTS_API_URL`
    /// Default: `http://127.0.0.1:3000/api`
    pub api_url: String,

    /// SQLite file for the local cache.
    /// Env: `CONTACTS_CACHE_PATH`
    /// Default: unset, meaning the platform data directory.
    pub cache_path: Option<PathBuf>,

    /// Upper bound on every remote call.
    /// Env: `CONTACTS_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,

    /// How often the health probe runs.
    /// Env: `CONTACTS_PROBE_INTERVAL_SECS`
    pub probe_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}{API_BASE_PATH}"),
            cache_path: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("CONTACTS_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.api_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid CONTACTS_API_URL, using default");
            }
        }

        if let Some(path) = var("CONTACTS_CACHE_PATH") {
            if !path.is_empty() {
                config.cache_path = Some(PathBuf::from(path));
            }
        }

        if let Some(secs) = seconds(&var, "CONTACTS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs;
        }

        if let Some(secs) = seconds(&var, "CONTACTS_PROBE_INTERVAL_SECS") {
            config.probe_interval = secs;
        }

        config
    }
}

/// A positive whole number of seconds, or `None` (with a warning).
fn seconds(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = var(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid duration, using default");
            None
        }
    }
}
