//! Shell configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORAGE_PATH: &str = ".projectflow/storage.json";
pub const DEFAULT_MIN_LOADING_MS: u64 = 800;
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric override could not be parsed.
    #[error("invalid {var}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Identity API base URL. `None` selects the in-memory demo service.
    pub api_url: Option<String>,
    /// File backing durable client storage.
    pub storage_path: PathBuf,
    /// Minimum time the loading view stays up after startup.
    pub min_loading: Duration,
    /// Upper bound on startup session resolution.
    pub resolve_timeout: Duration,
    pub http: HttpTimeouts,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            min_loading: Duration::from_millis(DEFAULT_MIN_LOADING_MS),
            resolve_timeout: Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS),
            http: HttpTimeouts::default(),
        }
    }
}

impl ShellConfig {
    /// Build typed shell config from environment variables.
    ///
    /// All optional:
    /// - `PROJECTFLOW_API_URL`: identity API base URL (demo service when unset)
    /// - `PROJECTFLOW_TOKEN_PATH`: storage file, default `.projectflow/storage.json`
    /// - `PROJECTFLOW_MIN_LOADING_MS`: default 800
    /// - `PROJECTFLOW_RESOLVE_TIMEOUT_SECS`: default 10
    /// - `PROJECTFLOW_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PROJECTFLOW_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric override is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ShellConfig::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric override is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("PROJECTFLOW_API_URL")
            .map(|raw| raw.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty());
        let storage_path = lookup("PROJECTFLOW_TOKEN_PATH")
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);

        let min_loading_ms = parse_u64(&lookup, "PROJECTFLOW_MIN_LOADING_MS", DEFAULT_MIN_LOADING_MS)?;
        let resolve_secs = parse_u64(&lookup, "PROJECTFLOW_RESOLVE_TIMEOUT_SECS", DEFAULT_RESOLVE_TIMEOUT_SECS)?;
        let http = HttpTimeouts {
            request_secs: parse_u64(&lookup, "PROJECTFLOW_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_u64(&lookup, "PROJECTFLOW_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self {
            api_url,
            storage_path,
            min_loading: Duration::from_millis(min_loading_ms),
            resolve_timeout: Duration::from_secs(resolve_secs),
            http,
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
