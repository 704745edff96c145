//! Discovery documents and their caches.
//!
//! A discovery document describes an API's resources and methods; the client
//! resolves the `reports.batchGet` endpoint from it instead of hard-coding
//! the URL. Documents rarely change, so they go through a [`DiscoveryCache`]:
//!
//! - [`MemoryDiscoveryCache`]: process-wide map, shared by every instance
//! - [`TempFileDiscoveryCache`]: one file per URL in the system temp dir
//! - [`DumpFileDiscoveryCache`]: one file per URL and day in a chosen
//!   directory, so the document is refreshed daily

use crate::fetcher::Fetcher;
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

const FILE_STEM: &str = "google_api_discovery";

/// Stable lowercase hex SHA-256 of a discovery URL.
pub fn url_hash(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Storage for fetched discovery documents keyed by URL.
pub trait DiscoveryCache: Send + Sync {
    /// Stored document for `url`, if any.
    fn get(&self, url: &str) -> Result<Option<String>>;
    /// Store `content` for `url`.
    fn set(&self, url: &str, content: &str) -> Result<()>;
}

static MEMORY: Lazy<Mutex<HashMap<String, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// In-process cache shared by all instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDiscoveryCache;

impl DiscoveryCache for MemoryDiscoveryCache {
    fn get(&self, url: &str) -> Result<Option<String>> {
        let map = MEMORY
            .lock()
            .map_err(|_| Error::Cache("discovery memory cache poisoned".into()))?;
        Ok(map.get(url).cloned())
    }

    fn set(&self, url: &str, content: &str) -> Result<()> {
        let mut map = MEMORY
            .lock()
            .map_err(|_| Error::Cache("discovery memory cache poisoned".into()))?;
        map.insert(url.to_string(), content.to_string());
        Ok(())
    }
}

/// One undated file per URL, written atomically.
#[derive(Debug, Clone)]
pub struct TempFileDiscoveryCache {
    directory: PathBuf,
}

impl Default for TempFileDiscoveryCache {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir(),
        }
    }
}

impl TempFileDiscoveryCache {
    /// Cache rooted somewhere other than the system temp dir.
    pub fn in_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// File backing `url`.
    pub fn filename(&self, url: &str) -> PathBuf {
        self.directory.join(format!("{FILE_STEM}_{}", url_hash(url)))
    }
}

impl DiscoveryCache for TempFileDiscoveryCache {
    fn get(&self, url: &str) -> Result<Option<String>> {
        read_if_exists(&self.filename(url))
    }

    fn set(&self, url: &str, content: &str) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.directory)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.filename(url))
            .map_err(|e| Error::Cache(format!("Failed to persist discovery document: {e}")))?;
        Ok(())
    }
}

/// One file per URL and day.
#[derive(Debug, Clone)]
pub struct DumpFileDiscoveryCache {
    directory: PathBuf,
    date: Option<NaiveDate>,
}

impl DumpFileDiscoveryCache {
    /// Cache keyed by today's local date.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            date: None,
        }
    }

    /// Cache keyed by a fixed date instead of today.
    pub fn pinned(directory: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            directory: directory.into(),
            date: Some(date),
        }
    }

    /// File backing `url` for the cache's date.
    pub fn filename(&self, url: &str) -> PathBuf {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        self.directory.join(format!(
            "{FILE_STEM}_{}_{}.json",
            date.format("%Y-%m-%d"),
            url_hash(url)
        ))
    }
}

impl DiscoveryCache for DumpFileDiscoveryCache {
    fn get(&self, url: &str) -> Result<Option<String>> {
        read_if_exists(&self.filename(url))
    }

    fn set(&self, url: &str, content: &str) -> Result<()> {
        debug!("DumpFileDiscoveryCache SET: {url}");
        fs::create_dir_all(&self.directory)?;
        let path = self.filename(url);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Google API and version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// Management API (`analytics`, `v3`).
    V3,
    /// Reporting API (`analyticsreporting`, `v4`).
    V4,
}

impl ApiVersion {
    /// Discovery service name.
    #[must_use]
    pub const fn service(self) -> &'static str {
        match self {
            Self::V3 => "analytics",
            Self::V4 => "analyticsreporting",
        }
    }

    /// Version label.
    #[must_use]
    pub const fn version(self) -> &'static str {
        match self {
            Self::V3 => "v3",
            Self::V4 => "v4",
        }
    }

    /// Discovery URL taken from `config`.
    pub fn discovery_url(self, config: &crate::config::ApiConfig) -> &str {
        match self {
            Self::V3 => &config.discovery_url_v3,
            Self::V4 => &config.discovery_url_v4,
        }
    }
}

/// The parts of a discovery document needed to build request URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryDocument {
    /// API name, e.g. `analyticsreporting`.
    #[serde(default)]
    pub name: String,
    /// API version, e.g. `v4`.
    #[serde(default)]
    pub version: String,
    /// Base URL with trailing slash.
    pub root_url: String,
    /// Path appended to `root_url` before method paths.
    #[serde(default)]
    pub service_path: String,
    /// Top-level resources.
    #[serde(default)]
    pub resources: HashMap<String, Resource>,
}

/// A resource and its methods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    /// Methods keyed by name.
    #[serde(default)]
    pub methods: HashMap<String, Method>,
}

/// A callable method.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    /// Path relative to `rootUrl + servicePath`.
    pub path: String,
    /// HTTP verb.
    #[serde(default)]
    pub http_method: String,
}

impl DiscoveryDocument {
    /// Parse a document.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Discovery(format!("Malformed discovery document: {e}")))
    }

    /// Full URL of `resource.method`.
    pub fn method_url(&self, resource: &str, method: &str) -> Result<String> {
        let found = self
            .resources
            .get(resource)
            .and_then(|r| r.methods.get(method))
            .ok_or_else(|| {
                Error::Discovery(format!(
                    "{} {} has no method {resource}.{method}",
                    self.name, self.version
                ))
            })?;

        Ok(format!("{}{}{}", self.root_url, self.service_path, found.path))
    }
}

/// Fetches discovery documents through a cache.
pub struct DiscoveryClient {
    fetcher: Fetcher,
    cache: Box<dyn DiscoveryCache>,
}

impl DiscoveryClient {
    /// Client reading and filling `cache`.
    pub fn new(fetcher: Fetcher, cache: Box<dyn DiscoveryCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Raw document text for `url`, from the cache when possible.
    ///
    /// Fetched text is only cached once it parses as a discovery document.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        self.load(url).await.map(|(content, _)| content)
    }

    /// Parsed document for `url`.
    pub async fn document(&self, url: &str) -> Result<DiscoveryDocument> {
        self.load(url).await.map(|(_, document)| document)
    }

    async fn load(&self, url: &str) -> Result<(String, DiscoveryDocument)> {
        if let Some(content) = self.cache.get(url)? {
            debug!("Discovery cache hit for {url}");
            let document = DiscoveryDocument::parse(&content)?;
            return Ok((content, document));
        }

        let content = self.fetcher.get_text(url).await?;
        let document = DiscoveryDocument::parse(&content)?;
        self.cache.set(url, &content)?;
        info!("Cached discovery document for {url}");
        Ok((content, document))
    }
}

impl std::fmt::Debug for DiscoveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryClient").finish_non_exhaustive()
    }
}
