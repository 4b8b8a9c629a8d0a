//! A single named cache scope backed by one file.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::backend::{Backend, BackendKind, Persistence};
use crate::codec;
use crate::config::{CacheConfig, Clock};
use crate::duration::CacheDuration;
use crate::entry::Entry;
use crate::error::Result;
use crate::map::ConcurrentMap;
use crate::value::Cacheable;

/// The two cache namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Lives as long as one shell session.
    Session,
    /// Shared by every session of this user on this machine.
    Device,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Session, Scope::Device];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Session => "session",
            Scope::Device => "device",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(Scope::Session),
            "device" => Ok(Scope::Device),
            other => Err(format!("unknown cache scope '{other}' (expected session or device)")),
        }
    }
}

/// One cache scope: an in-memory map plus the file it is persisted to.
///
/// Mutations mark the store dirty; [`Store::close`] writes the whole map back
/// only when the store is dirty and persistence is enabled.
#[derive(Debug)]
pub struct Store {
    scope: Scope,
    cache: ConcurrentMap<Entry>,
    path: PathBuf,
    dirty: AtomicBool,
    persist: bool,
    backend: BackendKind,
    mapped_capacity: usize,
    clock: Clock,
}

impl Store {
    /// Create an empty, clean store without touching `path`.
    pub fn new(scope: Scope, path: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        Self {
            scope,
            cache: ConcurrentMap::new(),
            path: path.into(),
            dirty: AtomicBool::new(false),
            persist: config.persist,
            backend: config.backend,
            mapped_capacity: config.mapped_capacity,
            clock: config.clock.clone(),
        }
    }

    /// Create a store and fill it from the blob at `path`.
    ///
    /// Expired entries are dropped. If the file cannot be opened or decoded
    /// the store starts empty and dirty, so closing it rewrites the file in
    /// the current format.
    pub fn load(scope: Scope, path: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        let store = Self::new(scope, path, config);

        match store.read_backend() {
            Ok(entries) => {
                let now = store.clock.now();
                for (key, entry) in entries {
                    if entry.expired_at(now) {
                        debug!(scope = %scope, key = %key, "Skipping expired key");
                        continue;
                    }
                    trace!(scope = %scope, key = %key, "Loading key");
                    store.cache.set(key, entry);
                }
                debug!(
                    scope = %scope,
                    path = %store.path.display(),
                    entries = store.cache.len(),
                    "Cache loaded"
                );
            }
            Err(e) => {
                debug!(
                    scope = %scope,
                    path = %store.path.display(),
                    error = %e,
                    "Cache not loaded, starting empty"
                );
                store.mark_dirty();
            }
        }

        store
    }

    fn read_backend(&self) -> Result<HashMap<String, Entry>> {
        let mut backend = Backend::open(self.backend, &self.path, self.mapped_capacity)?;
        let blob = backend.read();
        if let Err(e) = backend.close() {
            warn!(scope = %self.scope, error = %e, "Failed to release cache backend after load");
        }
        codec::decode(&blob?)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    /// Whether the backing file is out of date with memory.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Number of entries held, including ones that expired since loading.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Read a typed value.
    ///
    /// Returns `None` when the key is absent, expired or holds a value of a
    /// different type. An expired entry is removed and the store marked dirty.
    pub fn get<T: Cacheable>(&self, key: &str) -> Option<T> {
        let Some(entry) = self.cache.get(key) else {
            trace!(scope = %self.scope, key = %key, "Key not found");
            return None;
        };

        let now = self.clock.now();
        if entry.expired_at(now) {
            debug!(scope = %self.scope, key = %key, "Key expired");
            // Only drop what is still expired; a concurrent set may have
            // replaced it in the meantime.
            self.cache.delete_if(key, |current| current.expired_at(now));
            self.mark_dirty();
            return None;
        }

        match T::from_value(&entry.value) {
            Some(value) => {
                trace!(scope = %self.scope, key = %key, "Found entry");
                Some(value)
            }
            None => {
                debug!(
                    scope = %self.scope,
                    key = %key,
                    stored = entry.value.type_name(),
                    expected = std::any::type_name::<T>(),
                    "Type mismatch"
                );
                None
            }
        }
    }

    /// Whether a live (non-expired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.cache.get(key).is_some_and(|e| !e.expired_at(now))
    }

    /// Store a value for `duration`.
    ///
    /// A duration of zero seconds ("none", empty or unparsable) stores
    /// nothing and leaves the store clean.
    pub fn set<T: Cacheable>(&self, key: impl Into<String>, value: T, duration: &CacheDuration) {
        let ttl = duration.seconds();
        if ttl == 0 {
            return;
        }

        let key = key.into();
        debug!(scope = %self.scope, key = %key, duration = %duration, "Setting entry");
        self.cache
            .set(key, Entry::new(value.into_value(), self.clock.now(), ttl));
        self.mark_dirty();
    }

    /// Remove `key`. Marks the store dirty even if nothing was removed.
    pub fn delete(&self, key: &str) {
        debug!(scope = %self.scope, key = %key, "Deleting key");
        self.cache.delete(key);
        self.mark_dirty();
    }

    /// Remove every entry.
    pub fn delete_all(&self) {
        debug!(scope = %self.scope, "Deleting all keys");
        self.cache.clear();
        self.mark_dirty();
    }

    /// All entries sorted by key, expired ones included.
    pub fn entries(&self) -> Vec<(String, Entry)> {
        let mut entries: Vec<_> = self.cache.snapshot().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Human-readable listing of the store's entries.
    pub fn describe(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            return format!("Store {} is empty\n", self.scope);
        }

        let now = self.clock.now();
        let mut out = format!("Store {} ({} entries)\n", self.scope, entries.len());
        for (key, entry) in &entries {
            let marker = if entry.expired_at(now) { " [EXPIRED]" } else { "" };
            let _ = writeln!(out, "\nKey: {key}{marker}");
            let _ = writeln!(out, "  Value: {}", entry.value);
            let _ = writeln!(out, "  Type: {}", entry.value.type_name());
            match entry.expires_at() {
                None => {
                    let _ = writeln!(out, "  TTL: never expires");
                }
                Some(at) => {
                    let _ = writeln!(out, "  TTL: {}s (expires at {})", entry.ttl, format_timestamp(at));
                }
            }
        }
        out
    }

    /// Write the store back if it is dirty and persistence is enabled.
    ///
    /// Consumes the store: a flushed store is never used again. Entries are
    /// written as they are; expiry is not re-checked.
    pub fn close(self) -> Result<()> {
        if !self.persist || !self.is_dirty() {
            debug!(scope = %self.scope, "Not persisting");
            return Ok(());
        }

        let snapshot = self.cache.snapshot();
        let blob = codec::encode(&snapshot)?;

        let mut backend = Backend::open(self.backend, &self.path, self.mapped_capacity)?;
        let written = backend.write(&blob);
        let closed = backend.close();
        written?;
        closed?;

        debug!(
            scope = %self.scope,
            path = %self.path.display(),
            entries = snapshot.len(),
            bytes = blob.len(),
            "Cache persisted"
        );
        Ok(())
    }
}

fn format_timestamp(unix: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Json, Value};
    use std::sync::Arc;
    use std::sync::atomic::AtomicI64;
    use tempfile::TempDir;

    fn fake_clock(start: i64) -> (Clock, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(start));
        let handle = Arc::clone(&now);
        (Clock::new(move || handle.load(Ordering::SeqCst)), now)
    }

    fn test_store(dir: &TempDir) -> (Store, Arc<AtomicI64>) {
        let (clock, now) = fake_clock(1_000_000);
        let config = CacheConfig::new().with_clock(clock);
        let store = Store::load(Scope::Session, dir.path().join("posh.cache.test"), &config);
        (store, now)
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("session".parse::<Scope>().unwrap(), Scope::Session);
        assert_eq!("DEVICE".parse::<Scope>().unwrap(), Scope::Device);
        assert!("global".parse::<Scope>().is_err());
        assert_eq!(Scope::Device.to_string(), "device");
    }

    #[test]
    fn test_missing_file_starts_empty_and_dirty() {
        let dir = TempDir::new().unwrap();
        let (store, _) = test_store(&dir);
        assert!(store.is_empty());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let (store, _) = test_store(&dir);

        store.set("platform", "linux", &CacheDuration::INFINITE);
        store.set("count", 42i64, &CacheDuration::ONE_HOUR);

        assert_eq!(store.get::<String>("platform").as_deref(), Some("linux"));
        assert_eq!(store.get::<i64>("count"), Some(42));
        assert!(store.contains("count"));
    }

    #[test]
    fn test_set_with_no_cache_duration_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::new();
        let store = Store::new(Scope::Device, dir.path().join("posh.cache"), &config);

        store.set("key", "value", &CacheDuration::NONE);
        store.set("key", "value", &CacheDuration::new("bogus"));

        assert_eq!(store.get::<String>("key"), None);
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_expired_get_removes_entry_and_marks_dirty() {
        let dir = TempDir::new().unwrap();
        let (clock, now) = fake_clock(1_000);
        let config = CacheConfig::new().with_clock(clock);
        let store = Store::new(Scope::Device, dir.path().join("posh.cache"), &config);

        store.set("wifi", "home", &CacheDuration::new("10s"));
        now.store(1_009, Ordering::SeqCst);
        assert_eq!(store.get::<String>("wifi").as_deref(), Some("home"));

        now.store(1_010, Ordering::SeqCst);
        assert_eq!(store.get::<String>("wifi"), None);
        assert_eq!(store.len(), 0);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let (store, _) = test_store(&dir);

        store.set("count", 42i64, &CacheDuration::ONE_HOUR);
        assert_eq!(store.get::<String>("count"), None);
        assert_eq!(store.get::<bool>("count"), None);
        // The entry survives a mismatched read
        assert_eq!(store.get::<i64>("count"), Some(42));
    }

    #[test]
    fn test_delete_marks_dirty_even_when_absent() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::new();
        let store = Store::new(Scope::Device, dir.path().join("posh.cache"), &config);

        store.delete("never-set");
        assert!(store.is_dirty());
    }

    #[test]
    fn test_delete_all() {
        let dir = TempDir::new().unwrap();
        let (store, _) = test_store(&dir);
        store.set("a", 1i64, &CacheDuration::ONE_HOUR);
        store.set("b", 2i64, &CacheDuration::ONE_HOUR);

        store.delete_all();
        assert!(store.is_empty());
        assert_eq!(store.get::<i64>("a"), None);
    }

    #[test]
    fn test_close_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posh.cache");
        let (clock, now) = fake_clock(5_000);
        let config = CacheConfig::new().with_clock(clock);

        let store = Store::load(Scope::Device, &path, &config);
        store.set("short", "gone soon", &CacheDuration::new("30s"));
        store.set("long", "stays", &CacheDuration::ONE_DAY);
        store.set("forever", Value::Bool(true), &CacheDuration::INFINITE);
        store.close().unwrap();

        now.store(5_100, Ordering::SeqCst);
        let reloaded = Store::load(Scope::Device, &path, &config);
        assert!(!reloaded.is_dirty());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get::<String>("short"), None);
        assert_eq!(reloaded.get::<String>("long").as_deref(), Some("stays"));
        assert_eq!(reloaded.get::<bool>("forever"), Some(true));
    }

    #[test]
    fn test_clean_close_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posh.cache");
        let config = CacheConfig::new();

        let store = Store::load(Scope::Device, &path, &config);
        store.set("k", "v", &CacheDuration::ONE_DAY);
        store.close().unwrap();
        let before = std::fs::read(&path).unwrap();

        let reloaded = Store::load(Scope::Device, &path, &config);
        assert_eq!(reloaded.get::<String>("k").as_deref(), Some("v"));
        assert!(!reloaded.is_dirty());
        reloaded.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_persistence_disabled_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posh.cache");
        let config = CacheConfig::new().with_persist(false);

        let store = Store::load(Scope::Device, &path, &config);
        store.set("k", "v", &CacheDuration::ONE_DAY);
        assert!(store.is_dirty());
        store.close().unwrap();

        let reloaded = Store::load(Scope::Device, &path, &CacheConfig::new());
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_old_format_is_replaced_on_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posh.cache");
        std::fs::write(&path, br#"{"key":{"value":"x","timestamp":1,"ttl":60}}"#).unwrap();

        let store = Store::load(Scope::Device, &path, &CacheConfig::new());
        assert!(store.is_empty());
        assert!(store.is_dirty());
        store.close().unwrap();

        let blob = std::fs::read(&path).unwrap();
        assert_eq!(&blob[..4], b"PSHC");
    }

    #[test]
    fn test_json_payload() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Battery {
            percentage: u8,
            charging: bool,
        }

        let dir = TempDir::new().unwrap();
        let (store, _) = test_store(&dir);
        store.set(
            "battery",
            Json(Battery {
                percentage: 80,
                charging: true,
            }),
            &CacheDuration::ONE_MINUTE,
        );

        let Json(battery) = store.get::<Json<Battery>>("battery").unwrap();
        assert_eq!(battery.percentage, 80);
        assert!(battery.charging);
    }

    #[test]
    fn test_describe() {
        let dir = TempDir::new().unwrap();
        let (store, now) = test_store(&dir);
        assert_eq!(store.describe(), "Store session is empty\n");

        store.set("test_key1", "test_value1", &CacheDuration::ONE_HOUR);
        store.set("test_key2", 42i64, &CacheDuration::INFINITE);
        store.set("expired_key", "expired_value", &CacheDuration::new("1s"));
        now.fetch_add(10, Ordering::SeqCst);

        let out = store.describe();
        assert!(out.contains("Key: test_key1\n"));
        assert!(out.contains("Value: \"test_value1\""));
        assert!(out.contains("Type: string"));
        assert!(out.contains("Key: test_key2\n"));
        assert!(out.contains("Value: 42"));
        assert!(out.contains("Type: int"));
        assert!(out.contains("Key: expired_key [EXPIRED]"));
        assert!(out.contains("never expires"));
        assert!(out.contains("expires at"));
    }
}
