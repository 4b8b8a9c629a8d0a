//! Configuration for the cache manager.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::BackendKind;
use crate::backend::layout::MIN_CAPACITY;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "POSH_CACHE_DIR";

/// Environment variable overriding the session identifier.
pub const SESSION_ID_ENV: &str = "POSH_SESSION_ID";

/// Source of "now" in unix seconds.
///
/// Stores read the clock when stamping new entries and when checking expiry;
/// tests substitute their own to move time forward.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> i64 + Send + Sync>);

impl Clock {
    /// Wall-clock time.
    pub fn system() -> Self {
        Self(Arc::new(|| chrono::Utc::now().timestamp()))
    }

    /// A clock backed by an arbitrary function.
    pub fn new(now: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(now))
    }

    pub fn now(&self) -> i64 {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}

/// Configuration for the cache manager.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the backing files.
    /// `None` resolves through `POSH_CACHE_DIR` and the platform cache dir.
    pub cache_dir: Option<PathBuf>,

    /// Session identifier used to name the session store's file.
    /// `None` resolves through `POSH_SESSION_ID` or a generated id.
    pub session_id: Option<String>,

    /// Whether dirty stores are written back on close.
    pub persist: bool,

    /// Physical storage strategy.
    pub backend: BackendKind,

    /// Initial content capacity for the mapped backend.
    pub mapped_capacity: usize,

    /// Time source for entry stamps and expiry checks.
    pub clock: Clock,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            session_id: None,
            persist: true,
            backend: BackendKind::default(),
            mapped_capacity: MIN_CAPACITY,
            clock: Clock::system(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Use a fixed session identifier.
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Enable or disable writing dirty stores on close.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Select the storage backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the initial mapped capacity (clamped when the backend opens).
    pub fn with_mapped_capacity(mut self, capacity: usize) -> Self {
        self.mapped_capacity = capacity;
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}
