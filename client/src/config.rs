//! Client configuration.
//!
//! Defaults target a transformation service on `localhost:5000` with no
//! request timeout. [`ClientConfig::from_env`] reads overrides from the
//! process environment (and a `.env` file if present):
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SHEETOPS_SERVICE_URL` | base URL of the transformation service |
//! | `SHEETOPS_TIMEOUT_SECS` | per-request timeout in seconds (`0` = none) |

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default service location.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Unmatched rows shown inline after a compare.
pub const DEFAULT_UNMATCHED_PREVIEW_LIMIT: usize = 5;

/// Duplicate groups shown inline after a duplicate search.
pub const DEFAULT_DUPLICATE_GROUP_PREVIEW_LIMIT: usize = 5;

pub const SERVICE_URL_VAR: &str = "SHEETOPS_SERVICE_URL";
pub const TIMEOUT_VAR: &str = "SHEETOPS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub unmatched_preview_limit: usize,
    pub duplicate_group_preview_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: None,
            unmatched_preview_limit: DEFAULT_UNMATCHED_PREVIEW_LIMIT,
            duplicate_group_preview_limit: DEFAULT_DUPLICATE_GROUP_PREVIEW_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Build from environment variables, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(SERVICE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(&url)?;
        }

        if let Some(raw) = lookup(TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: TIMEOUT_VAR.to_string(),
                value: raw.clone(),
            })?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the service base URL.
    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidServiceUrl(url.to_string()));
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
