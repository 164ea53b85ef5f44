//! TOML-based application configuration.
//!
//! Stores operator settings:
//! - Upstream balance API endpoint and campus area ids
//! - Query rate-limit window and threshold
//! - Messaging dispatch endpoint
//!
//! Configuration is stored at `~/.config/wattbind/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;

use super::data_dir;

/// Upstream balance API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account field the API expects in every query payload.
    #[serde(default = "default_account")]
    pub account: String,
    /// Campus name -> upstream area id.
    #[serde(default = "default_campuses")]
    pub campuses: BTreeMap<String, String>,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

/// Query throttle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Trailing window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// Queries allowed per identity within the window.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

/// Messaging dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Base URL of the message-send HTTP endpoint.
    #[serde(default = "default_messenger_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wattbind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://yktwd.csust.edu.cn:8988/web/Common/Tsm.html".into()
}
fn default_account() -> String {
    "000001".into()
}
fn default_campuses() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("云塘".to_string(), "0030000000002501".to_string()),
        ("金盆岭".to_string(), "0030000000002502".to_string()),
    ])
}
fn default_query_timeout_secs() -> u64 {
    10
}
fn default_window_secs() -> i64 {
    3600
}
fn default_threshold() -> usize {
    2
}
fn default_messenger_endpoint() -> String {
    "http://127.0.0.1:3000".into()
}
fn default_send_timeout_secs() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            account: default_account(),
            campuses: default_campuses(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            threshold: default_threshold(),
        }
    }
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_messenger_endpoint(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load configuration from disk, falling back to defaults if the file
    /// is missing or unreadable.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load configuration from disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/wattbind/config.toml"),
            message: e.to_string(),
        })?;
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Persist configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("~/.config/wattbind/config.toml"),
            message: e.to_string(),
        })?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.rate_limit.threshold, 2);
        assert_eq!(parsed.rate_limit.window_secs, 3600);
        assert_eq!(parsed.upstream.campuses.len(), 2);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[rate_limit]\nthreshold = 5\n").unwrap();
        assert_eq!(parsed.rate_limit.threshold, 5);
        assert_eq!(parsed.rate_limit.window_secs, 3600);
        assert!(!parsed.upstream.base_url.is_empty());
    }
}
