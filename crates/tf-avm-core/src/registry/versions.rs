//! File-backed cache of latest module versions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One cached lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVersion {
    pub version: String,
    /// Unix seconds at which the version was fetched.
    pub timestamp: i64,
}

/// Versions keyed by module source, persisted as a JSON object.
///
/// A missing or unreadable file starts an empty cache. Write failures are
/// logged and otherwise ignored; the cache is an optimisation, never a
/// source of errors.
#[derive(Debug)]
pub struct VersionCache {
    path: PathBuf,
    ttl_secs: u64,
    entries: Mutex<BTreeMap<String, CachedVersion>>,
}

impl VersionCache {
    pub fn open(path: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self {
            path,
            ttl_secs,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cached version for `source` if younger than the TTL. Expired entries
    /// are evicted.
    pub fn get(&self, source: &str) -> Option<String> {
        self.get_at(source, Utc::now().timestamp())
    }

    fn get_at(&self, source: &str, now: i64) -> Option<String> {
        let mut entries = self.lock();
        let entry = entries.get(source)?;
        let age = now.saturating_sub(entry.timestamp);
        if age >= 0 && (age as u64) < self.ttl_secs {
            return Some(entry.version.clone());
        }
        debug!(source = %source, age_secs = age, "version cache entry expired");
        entries.remove(source);
        None
    }

    /// Record a fetched version and persist the cache.
    pub fn set(&self, source: &str, version: &str) {
        self.insert(
            source,
            CachedVersion {
                version: version.to_string(),
                timestamp: Utc::now().timestamp(),
            },
        );
    }

    fn insert(&self, source: &str, entry: CachedVersion) {
        let mut entries = self.lock();
        entries.insert(source.to_string(), entry);
        self.save(&entries);
    }

    /// Drop one entry so the next lookup goes to the registry.
    pub fn invalidate(&self, source: &str) {
        let mut entries = self.lock();
        if entries.remove(source).is_some() {
            self.save(&entries);
        }
    }

    /// Drop every entry and delete the cache file.
    pub fn clear(&self) {
        self.lock().clear();
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove version cache");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, CachedVersion>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, entries: &BTreeMap<String, CachedVersion>) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_vec_pretty(entries).map_err(std::io::Error::other)?;
            std::fs::write(&self.path, json)
        })();
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to save version cache");
        }
    }
}

fn load(path: &Path) -> BTreeMap<String, CachedVersion> {
    if !path.exists() {
        return BTreeMap::new();
    }
    match std::fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
    {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load version cache");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("versions.json");

        let cache = VersionCache::open(&path, 3600);
        cache.set("Azure/avm-res-web-site/azurerm", "0.19.1");
        assert!(path.exists());

        let reopened = VersionCache::open(&path, 3600);
        assert_eq!(
            reopened.get("Azure/avm-res-web-site/azurerm").as_deref(),
            Some("0.19.1")
        );
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::open(dir.path().join("v.json"), 60);
        cache.insert(
            "a/b/c",
            CachedVersion {
                version: "1.0.0".into(),
                timestamp: 1_000,
            },
        );
        assert_eq!(cache.get_at("a/b/c", 1_059).as_deref(), Some("1.0.0"));
        assert_eq!(cache.get_at("a/b/c", 1_060), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = VersionCache::open(&path, 3600);
        assert!(cache.is_empty());
        cache.set("a/b/c", "2.0.0");
        assert_eq!(VersionCache::open(&path, 3600).len(), 1);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        let cache = VersionCache::open(&path, 3600);
        cache.set("a/b/c", "2.0.0");
        cache.clear();
        assert!(!path.exists());
        assert_eq!(cache.get("a/b/c"), None);
    }

    #[test]
    fn test_invalidate_drops_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VersionCache::open(dir.path().join("v.json"), 3600);
        cache.set("a/b/c", "1.0.0");
        cache.set("d/e/f", "2.0.0");
        cache.invalidate("a/b/c");
        assert_eq!(cache.get("a/b/c"), None);
        assert_eq!(cache.get("d/e/f").as_deref(), Some("2.0.0"));
    }
}
