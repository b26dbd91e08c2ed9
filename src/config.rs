//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
/// Safely under the backend's ~15-minute access-token lifetime.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 14 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`crate::SessionManager`] and everything built on it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, no trailing slash.
    pub base_url: String,
    /// Keep-alive cadence for silent token renewal.
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Config for the given backend origin with default timing.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Build config from environment variables.
    ///
    /// - `TENDER_BACKEND_URL`: backend origin (default `http://127.0.0.1:8000`)
    /// - `TENDER_REFRESH_INTERVAL_SECS`: default 840
    /// - `TENDER_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TENDER_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TENDER_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_owned());
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            refresh_interval: Duration::from_secs(env_parse(
                "TENDER_REFRESH_INTERVAL_SECS",
                DEFAULT_REFRESH_INTERVAL_SECS,
            )),
            request_timeout: Duration::from_secs(env_parse(
                "TENDER_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse(
                "TENDER_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
