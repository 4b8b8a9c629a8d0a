//! Cache directory and backing file names.
//!
//! Resolution order for the directory:
//! 1. An explicit directory (`CacheConfig::with_cache_dir`) or the
//!    `POSH_CACHE_DIR` environment variable, when non-empty
//! 2. Platform cache directory joined with `posh`
//!    (`$XDG_CACHE_HOME` or `~/.cache` on Linux, `~/Library/Caches` on macOS,
//!    `%LOCALAPPDATA%` on Windows)
//! 3. `~/.cache/posh`
//! 4. `./.posh-cache`
//!
//! The first candidate that exists or can be created wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use crate::config::CACHE_DIR_ENV;

/// Application directory name under the platform cache directory.
pub const APP_NAME: &str = "posh";

/// Device store file name; session files append `.<session id>`.
pub const FILE_NAME: &str = "posh.cache";

static CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The process-wide cache directory, resolved on first call.
pub fn cache_dir() -> &'static Path {
    CACHE_DIR.get_or_init(|| {
        let override_dir = std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from);
        resolve_cache_dir(override_dir.as_deref())
    })
}

/// Resolve the cache directory from an optional override.
///
/// An override that cannot be created falls through to the defaults.
pub fn resolve_cache_dir(override_dir: Option<&Path>) -> PathBuf {
    let mut candidates = Vec::with_capacity(4);
    if let Some(dir) = override_dir
        && !dir.as_os_str().is_empty()
    {
        candidates.push(dir.to_path_buf());
    }
    if let Some(dir) = dirs::cache_dir() {
        candidates.push(dir.join(APP_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".cache").join(APP_NAME));
    }

    for candidate in candidates {
        if ensure_dir(&candidate) {
            debug!(path = %candidate.display(), "Resolved cache directory");
            return candidate;
        }
        debug!(path = %candidate.display(), "Cache directory candidate unusable");
    }

    let fallback = PathBuf::from(".posh-cache");
    ensure_dir(&fallback);
    fallback
}

/// Make sure `dir` exists as a directory, creating it if needed.
pub fn ensure_dir(dir: &Path) -> bool {
    dir.is_dir() || fs::create_dir_all(dir).is_ok()
}

/// File name of the device store.
pub fn device_file_name() -> &'static str {
    FILE_NAME
}

/// File name of the session store for `session_id`.
///
/// Characters that are not safe in a file name are replaced by `_`.
pub fn session_file_name(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{FILE_NAME}.{safe}")
}

/// Whether `name` follows the backing file naming convention.
pub fn is_cache_file_name(name: &str) -> bool {
    name == FILE_NAME
        || name
            .strip_prefix(FILE_NAME)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_wins_and_is_created() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("cache");

        let resolved = resolve_cache_dir(Some(target.as_path()));
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let resolved = resolve_cache_dir(Some(Path::new("")));
        assert_ne!(resolved, PathBuf::from(""));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("posh");
        let first = resolve_cache_dir(Some(target.as_path()));
        let second = resolve_cache_dir(Some(target.as_path()));
        assert_eq!(first, second);
        assert_eq!(cache_dir(), cache_dir());
    }

    #[test]
    fn test_uncreatable_override_falls_through() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let target = blocker.join("cache");

        let resolved = resolve_cache_dir(Some(target.as_path()));
        assert_ne!(resolved, target);
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(device_file_name(), "posh.cache");
        assert_eq!(session_file_name("abc-123"), "posh.cache.abc-123");
        assert_eq!(session_file_name("../etc/passwd"), "posh.cache.___etc_passwd");
    }

    #[test]
    fn test_cache_file_name_convention() {
        assert!(is_cache_file_name("posh.cache"));
        assert!(is_cache_file_name("posh.cache.1234"));
        assert!(!is_cache_file_name("posh.cachefile"));
        assert!(!is_cache_file_name("other.cache"));
        assert!(!is_cache_file_name("posh.log"));
    }
}
