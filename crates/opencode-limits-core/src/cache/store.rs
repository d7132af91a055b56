//! File persistence for [`CacheRecord`].
//!
//! Default location: `$XDG_CACHE_HOME/opencode-limits/tmux.json`
//! (`~/.cache/opencode-limits/tmux.json` when unset).

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::record::CacheRecord;
use crate::config::expand_home;

/// Cache subdirectory and file name
const CACHE_DIR: &str = "opencode-limits";
const CACHE_FILE: &str = "tmux.json";

/// Resolve the cache file path, honoring an explicit override
pub fn cache_path(override_path: Option<&str>) -> PathBuf {
    if let Some(p) = override_path.filter(|p| !p.trim().is_empty()) {
        return expand_home(p.trim());
    }
    let base = match std::env::var("XDG_CACHE_HOME") {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".cache"),
    };
    base.join(CACHE_DIR).join(CACHE_FILE)
}

/// Reads and writes the snapshot file
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Create a store for the file at `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached record.
    ///
    /// Missing, unreadable and malformed files all read as "no record".
    pub fn load(&self) -> Option<CacheRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No usage cache at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("Failed to read usage cache {:?}: {}", self.path, e);
                return None;
            }
        };

        let record = CacheRecord::deserialize(&bytes);
        if record.is_none() {
            warn!("Ignoring malformed usage cache {:?}", self.path);
        }
        record
    }

    /// Persist `record`, replacing any previous snapshot.
    ///
    /// Writes to a temp file and renames it over the target so a crash
    /// never leaves a truncated cache behind.
    pub fn save(&self, record: &CacheRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }

        let json = record.serialize().context("Failed to serialize usage cache")?;

        let temp_path = self.path.with_extension("json.tmp");

        // Leftover from an interrupted write
        let _ = fs::remove_file(&temp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp cache file: {:?}", temp_path))?;

        file.write_all(&json)
            .with_context(|| format!("Failed to write temp cache file: {:?}", temp_path))?;

        file.sync_all()
            .with_context(|| format!("Failed to sync temp cache file: {:?}", temp_path))?;

        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to rename cache file: {:?}", self.path))?;

        debug!("Saved usage cache to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::record::{build_cache_record, FORMAT_VERSION};
    use crate::usage::UsageWindow;
    use chrono::{TimeZone, Utc};

    fn record() -> CacheRecord {
        let fetched_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        build_cache_record(
            &[UsageWindow::new("5HR", 12.0, None)],
            Some(&UsageWindow::new("monthly", 40.0, None)),
            "abc",
            fetched_at,
        )
    }

    #[test]
    fn test_save_creates_parent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested/deeper/tmux.json"));

        store.save(&record()).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, record());
        assert_eq!(loaded.format_version, FORMAT_VERSION);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("tmux.json"));

        store.save(&record()).unwrap();
        let mut newer = record();
        newer.auth_fingerprint = "def".to_string();
        newer.codex.clear();
        store.save(&newer).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.auth_fingerprint, "def");
        assert!(loaded.codex.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmux.json");
        std::fs::write(&path, "{\"fetched_at\": \"2026-01-01T00:00:00Z\", \"codex\": {").unwrap();
        assert!(CacheStore::new(path).load().is_none());
    }

    #[test]
    fn test_cache_path_override_expands_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            cache_path(Some("~/limits/cache.json")),
            home.join("limits/cache.json")
        );
        assert_eq!(
            cache_path(Some("/tmp/limits.json")),
            PathBuf::from("/tmp/limits.json")
        );
    }

    #[test]
    fn test_cache_path_uses_xdg_cache_home() {
        temp_env::with_var("XDG_CACHE_HOME", Some("/var/cache/me"), || {
            assert_eq!(
                cache_path(None),
                PathBuf::from("/var/cache/me/opencode-limits/tmux.json")
            );
        });
    }

    #[test]
    fn test_cache_path_default() {
        temp_env::with_var_unset("XDG_CACHE_HOME", || {
            let home = dirs::home_dir().unwrap();
            assert_eq!(cache_path(None), home.join(".cache/opencode-limits/tmux.json"));
        });
    }
}
