//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend location and endpoint paths
    #[serde(default)]
    pub api: ApiConfig,

    /// Token persistence settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "api.base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        for (name, path) in [
            ("api.refresh_path", &self.api.refresh_path),
            ("api.login_path", &self.api.login_path),
            ("api.logout_path", &self.api.logout_path),
            ("api.profile_path", &self.api.profile_path),
        ] {
            if path.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Token refresh endpoint (POST `{refreshToken}`)
    #[serde(default = "defaults::refresh_path")]
    pub refresh_path: String,

    #[serde(default = "defaults::login_path")]
    pub login_path: String,

    #[serde(default = "defaults::logout_path")]
    pub logout_path: String,

    #[serde(default = "defaults::profile_path")]
    pub profile_path: String,
}

impl ApiConfig {
    /// Parse the base URL, forcing a trailing slash so relative joins keep the prefix.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            refresh_path: defaults::refresh_path(),
            login_path: defaults::login_path(),
            logout_path: defaults::logout_path(),
            profile_path: defaults::profile_path(),
        }
    }
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the per-origin token files
    #[serde(default = "defaults::session_dir")]
    pub dir: PathBuf,

    /// Join concurrent 401s onto a single refresh call
    #[serde(default = "defaults::single_flight")]
    pub single_flight: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: defaults::session_dir(),
            single_flight: defaults::single_flight(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Api defaults
    pub fn base_url() -> String {
        "http://localhost:8080/api/v1/".into()
    }
    pub fn user_agent() -> String {
        concat!("libris-client/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn refresh_path() -> String {
        "auth/refresh-token".into()
    }
    pub fn login_path() -> String {
        "auth/login".into()
    }
    pub fn logout_path() -> String {
        "auth/logout".into()
    }
    pub fn profile_path() -> String {
        "auth/profile".into()
    }

    // Session defaults
    pub fn session_dir() -> PathBuf {
        PathBuf::from(".libris")
    }
    pub fn single_flight() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
