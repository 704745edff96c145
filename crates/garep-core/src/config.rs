//! Configuration management for garep.
//!
//! Configuration is stored in TOML format and every field has a default, so a
//! missing file or a partially filled one both load cleanly.
//!
//! ## Configuration Sources
//!
//! 1. **Config file**: `GAREP_CONFIG` if set, otherwise the platform config
//!    directory (see [`Config::default_path`])
//! 2. **Environment variables**: `GAREP_*` overrides applied on top
//!
//! ## Example Configuration File
//!
//! ```toml
//! [credentials]
//! key_path = "/home/user/.config/garep/service-account.json"
//!
//! [views]
//! site_view_id = "123456789"
//! app_view_id = "987654321"
//!
//! [cache]
//! enabled = true
//! directory = "/home/user/.cache/garep/dump"
//! file_prefix = "ga"
//!
//! [retry]
//! attempts = 12
//! delay_secs = 10
//!
//! [paging]
//! page_size = 1000
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Discovery document for the Analytics Reporting API v4.
pub const DISCOVERY_URL_V4: &str =
    "https://analyticsreporting.googleapis.com/$discovery/rest?version=v4";

/// Discovery document for the Analytics Management API v3.
pub const DISCOVERY_URL_V3: &str = "https://www.googleapis.com/discovery/v1/apis/analytics/v3/rest";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Service account credentials
    pub credentials: CredentialsConfig,
    /// Google Analytics view identifiers
    pub views: ViewsConfig,
    /// Result and discovery caching
    pub cache: CacheConfig,
    /// Backoff settings for transient failures
    pub retry: RetryConfig,
    /// Page size for paged reports
    pub paging: PagingConfig,
    /// API endpoints and transport settings
    pub api: ApiConfig,
}

/// Service account credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path to the service account JSON key.
    pub key_path: Option<PathBuf>,

    /// Pre-minted bearer token, only ever taken from `GAREP_ACCESS_TOKEN`.
    #[serde(skip)]
    pub access_token: Option<String>,
}

/// View identifiers for the two tracked properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewsConfig {
    /// View used for website reports (the default view).
    pub site_view_id: String,
    /// View used for mobile app reports.
    pub app_view_id: String,
}

/// Caching settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cached results are read back. Results are written either way.
    pub enabled: bool,
    /// Directory for result dump files.
    pub directory: PathBuf,
    /// Prefix shared by every result file this installation writes.
    pub file_prefix: String,
    /// Directory for dated discovery documents.
    pub discovery_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base = directories::ProjectDirs::from("dev", "garep", "garep").map_or_else(
            || {
                directories::BaseDirs::new().map_or_else(
                    || PathBuf::from(".garep"),
                    |base| base.home_dir().join(".garep"),
                )
            },
            |dirs| dirs.cache_dir().to_path_buf(),
        );

        Self {
            enabled: true,
            directory: base.join("dump"),
            file_prefix: "ga".to_string(),
            discovery_dir: base.join("discovery"),
        }
    }
}

/// Retry settings, clamped by [`crate::RetryPolicy::new`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failed call.
    pub attempts: u32,
    /// Delay before the first retry, doubled after each one.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: crate::retry::DEFAULT_RETRIES,
            delay_secs: crate::retry::DEFAULT_DELAY_SECS,
        }
    }
}

/// Paging settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PagingConfig {
    /// Rows per page; the sign is ignored and the value is capped at 10 000.
    pub page_size: i64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: crate::paging::DEFAULT_PAGE_SIZE.into(),
        }
    }
}

/// Endpoints and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Discovery URL for the Reporting API v4.
    pub discovery_url_v4: String,
    /// Discovery URL for the Management API v3.
    pub discovery_url_v3: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            discovery_url_v4: DISCOVERY_URL_V4.to_string(),
            discovery_url_v3: DISCOVERY_URL_V3.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from `GAREP_CONFIG` or the default location and
    /// apply `GAREP_*` environment overrides.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os("GAREP_CONFIG") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Write configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Platform config file location:
    /// - Linux: `~/.config/garep/config.toml`
    /// - macOS: `~/Library/Application Support/dev.garep.garep/config.toml`
    /// - Windows: `%APPDATA%\garep\garep\config\config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("dev", "garep", "garep")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `GAREP_*` overrides read through `lookup`.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = get("GAREP_KEY_PATH") {
            self.credentials.key_path = Some(PathBuf::from(path));
        }
        if let Some(token) = get("GAREP_ACCESS_TOKEN") {
            self.credentials.access_token = Some(token);
        }
        if let Some(view) = get("GAREP_SITE_VIEW_ID") {
            self.views.site_view_id = view;
        }
        if let Some(view) = get("GAREP_APP_VIEW_ID") {
            self.views.app_view_id = view;
        }
        if let Some(dir) = get("GAREP_CACHE_DIR") {
            let dir = PathBuf::from(dir);
            self.cache.discovery_dir = dir.join("discovery");
            self.cache.directory = dir.join("dump");
        }
    }
}
