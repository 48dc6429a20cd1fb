//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::CoreError;
use crate::Result;

pub const ENV_API_BASE: &str = "ADMINKIT_API_BASE";
pub const ENV_DB_PATH: &str = "ADMINKIT_DB_PATH";
pub const ENV_TIMEOUT_SECS: &str = "ADMINKIT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server origin, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Prefix applied to every API path
    pub api_prefix: String,
    /// Where the persisted credential lives
    pub database_path: PathBuf,
    /// Transport timeout; 0 disables it
    pub timeout_secs: u64,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_prefix: "/api/v1".to_string(),
            database_path: data_dir.join("adminkit.db"),
            timeout_secs: 30,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("AdminKit"))
            .unwrap_or_else(|| PathBuf::from(".adminkit"))
    }

    /// Defaults overridden by `ADMINKIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var(ENV_API_BASE) {
            config.base_url = base;
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            config.database_path = PathBuf::from(path);
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                CoreError::Config(format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT_SECS, secs))
            })?;
        }

        Ok(config)
    }

    /// Origin plus prefix, the root every endpoint is resolved against
    pub fn api_url(&self) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');

        let url = if prefix.is_empty() {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{}/{}", base, prefix))?
        };

        if url.cannot_be_a_base() {
            return Err(CoreError::Config(format!("{} is not a usable API base", url)));
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for the platform data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_prefix() {
        let config = Config::new(PathBuf::from("/tmp/adminkit"));
        assert_eq!(
            config.api_url().unwrap().as_str(),
            "http://localhost:3000/api/v1"
        );
        assert_eq!(config.database_path, PathBuf::from("/tmp/adminkit/adminkit.db"));

        let config = Config {
            base_url: "https://panel.example.com/".to_string(),
            api_prefix: "".to_string(),
            ..config
        };
        assert_eq!(config.api_url().unwrap().as_str(), "https://panel.example.com/");
    }

    #[test]
    fn test_api_url_rejects_garbage() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::new(PathBuf::from("."))
        };
        assert!(config.api_url().is_err());

        let config = Config {
            base_url: "mailto:admin@example.com".to_string(),
            ..Config::new(PathBuf::from("."))
        };
        assert!(matches!(config.api_url(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_timeout() {
        let mut config = Config::new(PathBuf::from("."));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        config.timeout_secs = 0;
        assert_eq!(config.timeout(), None);
    }
}
