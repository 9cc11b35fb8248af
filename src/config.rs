//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (`<config dir>/socialsync/config.toml` or `--config`)
//! 3. Environment variables (override)

use crate::error::{Result, SyncError};
use crate::sync::policy::PolicyTable;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const BASE_URL_ENV: &str = "SOCIALSYNC_BASE_URL";
pub const SESSION_COOKIE_ENV: &str = "SOCIALSYNC_SESSION_COOKIE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host of the API, e.g. "http://localhost:8000"
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Raw `Cookie` header value carrying the session
    pub session_cookie: Option<String>,
    /// Value for the `X-CSRFToken` header
    pub csrf_token: Option<String>,
    /// Path of the login page the navigator redirects to
    pub login_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            session_cookie: None,
            csrf_token: None,
            login_path: "/login/".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }
}

/// Synchronizer behavior knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Queries shorter than this (in characters) clear results without a request
    pub search_min_chars: usize,
    /// How many suggested users to request and keep
    pub suggested_limit: usize,
    /// Drop responses that were superseded by a later request on the same stream
    pub discard_stale_responses: bool,
    pub policies: PolicyTable,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            search_min_chars: 2,
            suggested_limit: 5,
            discard_stale_responses: true,
            policies: PolicyTable::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "socialsync=info".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("socialsync").join("config.toml"))
    }

    /// Load from an explicit path, or from the default location if it exists.
    /// A missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(cookie) = lookup(SESSION_COOKIE_ENV) {
            self.api.session_cookie = Some(cookie);
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(SyncError::Config(format!(
                "api.base_url must start with http:// or https://, got {:?}",
                self.api.base_url
            )));
        }
        if self.sync.suggested_limit == 0 {
            return Err(SyncError::Config(
                "sync.suggested_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
