//! Sweeping stale backing files out of the cache directory.
//!
//! Every session leaves a `posh.cache.<id>` file behind. `clear` removes the
//! cache files (device store included) that have not been written for
//! [`RETENTION_DAYS`] days, or every cache file when forced.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::paths;

/// Days a cache file is kept after its last write.
pub const RETENTION_DAYS: i64 = 7;

/// Result of a cache directory sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClearResult {
    /// Number of cache files examined.
    pub files_checked: usize,
    /// Paths that were deleted.
    pub removed: Vec<PathBuf>,
    /// Whether retention was bypassed.
    pub force: bool,
}

/// Remove stale cache files from `cache_dir`.
pub fn clear(cache_dir: &Path, force: bool) -> Result<ClearResult> {
    clear_before(cache_dir, force, Utc::now() - Duration::days(RETENTION_DAYS))
}

/// Remove cache files last modified before `cutoff` (all of them with
/// `force`).
pub fn clear_before(cache_dir: &Path, force: bool, cutoff: DateTime<Utc>) -> Result<ClearResult> {
    let mut result = ClearResult {
        force,
        ..ClearResult::default()
    };

    let dir = fs::read_dir(cache_dir).map_err(|e| Error::io(cache_dir, e))?;
    for entry in dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %cache_dir.display(), error = %e, "Failed to read cache directory entry");
                continue;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !paths::is_cache_file_name(name) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        result.files_checked += 1;

        let path = entry.path();
        if !force {
            let modified = metadata.modified().map(DateTime::<Utc>::from);
            match modified {
                Ok(modified) if modified >= cutoff => {
                    debug!(path = %path.display(), modified = %modified, "Cache file still fresh, skipping");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "No modification time, skipping");
                    continue;
                }
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed cache file");
                result.removed.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove cache file");
            }
        }
    }

    result.removed.sort();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_days: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let modified = SystemTime::now() - StdDuration::from_secs(age_days * 24 * 3600);
        file.set_modified(modified).unwrap();
        path
    }

    #[test]
    fn test_removes_only_stale_cache_files() {
        let dir = TempDir::new().unwrap();
        let device = touch(dir.path(), "posh.cache", 30);
        let stale = touch(dir.path(), "posh.cache.old-session", 8);
        let fresh = touch(dir.path(), "posh.cache.new-session", 1);
        let unrelated = touch(dir.path(), "notes.txt", 30);

        let result = clear(dir.path(), false).unwrap();

        assert_eq!(result.files_checked, 3);
        assert_eq!(result.removed, vec![device.clone(), stale.clone()]);
        assert!(!result.force);
        assert!(!device.exists());
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_fresh_device_file_is_kept() {
        let dir = TempDir::new().unwrap();
        let device = touch(dir.path(), "posh.cache", 2);

        let result = clear(dir.path(), false).unwrap();

        assert_eq!(result.files_checked, 1);
        assert!(result.removed.is_empty());
        assert!(device.exists());
    }

    #[test]
    fn test_force_removes_every_cache_file() {
        let dir = TempDir::new().unwrap();
        let device = touch(dir.path(), "posh.cache", 0);
        let session = touch(dir.path(), "posh.cache.abc", 0);
        let unrelated = touch(dir.path(), "posh.log", 0);

        let result = clear(dir.path(), true).unwrap();

        assert_eq!(result.removed.len(), 2);
        assert!(!device.exists());
        assert!(!session.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_directories_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posh.cache.dir")).unwrap();

        let result = clear(dir.path(), true).unwrap();
        assert_eq!(result.files_checked, 0);
        assert!(dir.path().join("posh.cache.dir").is_dir());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = clear(&dir.path().join("missing"), false).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
