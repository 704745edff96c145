//! Whole-result disk caching for report queries.
//!
//! Results are stored as JSON files under a directory, keyed by a file prefix
//! owned by the caller, a per-query prefix and a date:
//!
//! ```text
//! <dir>/<file_prefix>[_p<part>]_<prefix>_<YYYY-MM-DD>.json   (cached)
//! <dir>/<file_prefix>_<prefix>_data.json                     (updatable)
//! ```
//!
//! When caching is disabled the fetch always runs, but its result is still
//! written so a later enabled run can pick it up.

use crate::{DateDeque, Error, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which date goes into a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDate {
    /// The local date at the time of the call.
    Today,
    /// A fixed date, typically the report date.
    On(NaiveDate),
}

impl CacheDate {
    fn resolve(self) -> NaiveDate {
        match self {
            Self::Today => Local::now().date_naive(),
            Self::On(date) => date,
        }
    }
}

/// Disk cache for fetched results.
#[derive(Debug, Clone)]
pub struct ResultCache {
    directory: PathBuf,
    file_prefix: String,
    enabled: bool,
    part: Option<u32>,
}

impl ResultCache {
    /// Cache writing into `directory` with files starting with `file_prefix`.
    pub fn new(directory: impl Into<PathBuf>, file_prefix: impl Into<String>, enabled: bool) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: file_prefix.into(),
            enabled,
            part: None,
        }
    }

    /// Cache described by the `[cache]` config section.
    pub fn from_config(config: &crate::config::CacheConfig) -> Self {
        Self::new(&config.directory, &config.file_prefix, config.enabled)
    }

    /// Whether stored results are read back.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle reading stored results.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tag files with `_p<part>` so a query split into parts keeps one file
    /// per part. `None` removes the tag.
    pub const fn set_part(&mut self, part: Option<u32>) {
        self.part = part;
    }

    /// Directory holding the cache files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the dated file for `prefix`.
    pub fn dated_path(&self, prefix: &str, date: CacheDate) -> PathBuf {
        let owner = match self.part {
            Some(part) => format!("{}_p{part}", self.file_prefix),
            None => self.file_prefix.clone(),
        };
        self.directory.join(format!(
            "{owner}_{prefix}_{}.json",
            date.resolve().format("%Y-%m-%d")
        ))
    }

    /// Path of the updatable file for `prefix`.
    pub fn updatable_path(&self, prefix: &str) -> PathBuf {
        self.directory
            .join(format!("{}_{prefix}_data.json", self.file_prefix))
    }

    /// Return the stored result for `(prefix, date)` or run `fetch` and store it.
    ///
    /// Unreadable, unparsable and empty (`null`, `[]`, `{}`, `""`) files are
    /// misses.
    pub async fn cached<T, F, Fut>(&self, prefix: &str, date: CacheDate, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cached_when(prefix, date, fetch, |_| true).await
    }

    /// Like [`Self::cached`], but a fresh result is only stored when `store`
    /// accepts it. Rejected results are returned and fetched again next time.
    pub async fn cached_when<T, F, Fut, S>(
        &self,
        prefix: &str,
        date: CacheDate,
        fetch: F,
        store: S,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        S: FnOnce(&T) -> bool,
    {
        let path = self.dated_path(prefix, date);

        if self.enabled {
            if let Some(value) = Self::read(&path) {
                debug!("Cache hit: {}", path.display());
                return Ok(value);
            }
        }

        let value = fetch().await?;
        if store(&value) {
            self.write(&path, &value)?;
        } else {
            debug!("Not storing result in {}", path.display());
        }
        Ok(value)
    }

    /// Seed `fetch` with the stored deque for `prefix` and store what it returns.
    ///
    /// With caching disabled the seed is always empty. `fetch` is expected to
    /// fill in only the dates the seed lacks.
    pub async fn updatable<T, F, Fut>(&self, prefix: &str, fetch: F) -> Result<DateDeque<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(DateDeque<T>) -> Fut,
        Fut: Future<Output = Result<DateDeque<T>>>,
    {
        let path = self.updatable_path(prefix);

        let seed = if self.enabled {
            Self::read(&path).unwrap_or_default()
        } else {
            DateDeque::new()
        };
        debug!("Seeding {} with {} cached dates", path.display(), seed.len());

        let updated = fetch(seed).await?;
        self.write(&path, &updated)?;
        Ok(updated)
    }

    /// Delete every file owned by this cache's file prefix, including `.tmp`
    /// leftovers of interrupted writes.
    ///
    /// A file is owned when it is `<file_prefix>[_p<part>]_<prefix>_<date>` or
    /// `<file_prefix>_<prefix>_data`. Names are matched by shape only, so a
    /// file prefix that is itself `<file_prefix>_<word>` (`ga` and `ga_app`)
    /// cannot be told apart when both share a directory; give such caches
    /// separate directories.
    ///
    /// Returns the number of files removed. A missing directory removes nothing.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if is_owned_name(&self.file_prefix, &name.to_string_lossy()) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        info!("Removed {removed} cached results from {}", self.directory.display());
        Ok(removed)
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("{err}: cache file {} is empty, getting fresh...", path.display());
                return None;
            },
        };

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                debug!("Cache file {} is unreadable ({err}), getting fresh...", path.display());
                return None;
            },
        };

        if is_empty(&value) {
            debug!("Cache file {} holds an empty result, getting fresh...", path.display());
            return None;
        }

        serde_json::from_value(value)
            .map_err(|err| debug!("Cache file {} has the wrong shape: {err}", path.display()))
            .ok()
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| Error::Cache(format!("Failed to create cache directory: {e}")))?;

        let content = serde_json::to_vec(value)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .map_err(|e| Error::Cache(format!("Failed to write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, path)
            .map_err(|e| Error::Cache(format!("Failed to commit {}: {e}", path.display())))?;

        debug!("Stored result in {}", path.display());
        Ok(())
    }
}

fn is_owned_name(file_prefix: &str, name: &str) -> bool {
    let Some(stem) = name
        .strip_suffix(".json")
        .or_else(|| name.strip_suffix(".tmp"))
    else {
        return false;
    };
    let Some(rest) = stem
        .strip_prefix(file_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    if let Some(prefix) = rest.strip_suffix("_data") {
        return !prefix.is_empty();
    }

    let Some((prefix, date)) = rest.rsplit_once('_') else {
        return false;
    };
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return false;
    }
    let is_part = |tag: &str| {
        tag.strip_prefix('p')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    };
    let prefix = match prefix.split_once('_') {
        Some((tag, query)) if is_part(tag) => query,
        _ => prefix,
    };
    !prefix.is_empty()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_dated_path_layout() {
        let mut cache = ResultCache::new("/tmp/dump", "test_case", true);
        assert_eq!(
            cache.dated_path("sessions", CacheDate::On(day(30))),
            PathBuf::from("/tmp/dump/test_case_sessions_2020-01-30.json")
        );

        cache.set_part(Some(2));
        assert_eq!(
            cache.dated_path("sessions", CacheDate::On(day(30))),
            PathBuf::from("/tmp/dump/test_case_p2_sessions_2020-01-30.json")
        );
        assert_eq!(
            cache.updatable_path("daily"),
            PathBuf::from("/tmp/dump/test_case_daily_data.json")
        );
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: Vec<u32> = cache
                .cached("users", CacheDate::Today, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_fetches_but_still_writes() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", false);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let _: Vec<u32> = cache
                .cached("users", CacheDate::On(day(1)), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![9])
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.dated_path("users", CacheDate::On(day(1))).exists());
    }

    #[tokio::test]
    async fn test_empty_and_corrupt_files_are_misses() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);
        let path = cache.dated_path("users", CacheDate::On(day(2)));

        for stale in ["[]", "null", "{}", "\"\"", "{not json"] {
            fs::write(&path, stale).unwrap();
            let value: Vec<u32> = cache
                .cached("users", CacheDate::On(day(2)), || async { Ok(vec![5]) })
                .await
                .unwrap();
            assert_eq!(value, vec![5], "{stale:?} should be treated as a miss");
        }
    }

    #[tokio::test]
    async fn test_date_is_part_of_key() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);

        let first: Vec<u32> = cache
            .cached("users", CacheDate::On(day(1)), || async { Ok(vec![1]) })
            .await
            .unwrap();
        let second: Vec<u32> = cache
            .cached("users", CacheDate::On(day(2)), || async { Ok(vec![2]) })
            .await
            .unwrap();

        assert_eq!(first, vec![1]);
        assert_eq!(second, vec![2]);
    }

    #[tokio::test]
    async fn test_fetch_error_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);

        let result: Result<Vec<u32>> = cache
            .cached("users", CacheDate::On(day(3)), || async {
                Err(Error::Auth("expired".into()))
            })
            .await;

        assert!(matches!(result, Err(Error::Auth(_))));
        assert!(!cache.dated_path("users", CacheDate::On(day(3))).exists());
    }

    #[tokio::test]
    async fn test_updatable_seeds_from_previous_run() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);

        let first = cache
            .updatable("daily", |mut seed: DateDeque<u32>| async move {
                assert!(seed.is_empty());
                seed.push_back(day(1), 10);
                Ok(seed)
            })
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = cache
            .updatable("daily", |mut seed: DateDeque<u32>| async move {
                assert!(seed.contains(day(1)), "previous dates are reused");
                if !seed.contains(day(2)) {
                    seed.push_back(day(2), 20);
                }
                Ok(seed)
            })
            .await
            .unwrap();

        assert_eq!(second.dates().collect::<Vec<_>>(), vec![day(1), day(2)]);
    }

    #[tokio::test]
    async fn test_updatable_disabled_starts_empty() {
        let dir = TempDir::new().unwrap();
        let mut cache = ResultCache::new(dir.path(), "ga", true);
        cache
            .updatable("daily", |mut seed: DateDeque<u32>| async move {
                seed.push_back(day(1), 1);
                Ok(seed)
            })
            .await
            .unwrap();

        cache.set_enabled(false);
        cache
            .updatable("daily", |seed: DateDeque<u32>| async move {
                assert!(seed.is_empty());
                Ok(seed)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clear_only_touches_owned_files() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);
        let _: Vec<u32> = cache
            .cached("users", CacheDate::On(day(1)), || async { Ok(vec![1]) })
            .await
            .unwrap();
        fs::write(dir.path().join("other_users_2020-01-01.json"), "[1]").unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(dir.path().join("other_users_2020-01-01.json").exists());

        let missing = ResultCache::new(dir.path().join("absent"), "ga", true);
        assert_eq!(missing.clear().unwrap(), 0);
    }

    #[test]
    fn test_clear_matches_owned_name_shapes() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);
        let owned = [
            "ga_users_2020-01-01.json",
            "ga_p2_users_2020-01-01.json",
            "ga_users_data.json",
            "ga_users_2020-01-01.tmp",
            "ga_users_data.tmp",
        ];
        let foreign = [
            "gax_users_2020-01-01.json",
            "ga_notes.json",
            "ga_users_latest.json",
            "ga_2020-01-01.json",
            "ga_users_2020-01-01.bak",
        ];
        for name in owned.iter().chain(&foreign) {
            fs::write(dir.path().join(name), "[1]").unwrap();
        }

        assert_eq!(cache.clear().unwrap(), owned.len());
        for name in owned {
            assert!(!dir.path().join(name).exists(), "{name} should be removed");
        }
        for name in foreign {
            assert!(dir.path().join(name).exists(), "{name} should be kept");
        }
    }

    #[tokio::test]
    async fn test_rejected_results_are_not_stored() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "ga", true);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let value: Vec<Vec<u32>> = cache
                .cached_when(
                    "users",
                    CacheDate::On(day(1)),
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(vec![Vec::new()])
                    },
                    |pages| pages.iter().any(|page| !page.is_empty()),
                )
                .await
                .unwrap();
            assert_eq!(value, vec![Vec::<u32>::new()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.dated_path("users", CacheDate::On(day(1))).exists());
    }
}
