//! Process-wide façade over the session and device stores.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::duration::CacheDuration;
use crate::error::{Error, Result};
use crate::paths;
use crate::session;
use crate::store::{Scope, Store};
use crate::value::Cacheable;

/// Owns at most one [`Store`] per [`Scope`].
///
/// Construct one at startup, hand out references to consumers, and call
/// [`CacheManager::close`] on the way out. Each store is loaded from disk the
/// first time its scope is touched.
///
/// ```rust,ignore
/// let cache = CacheManager::init(CacheConfig::default());
/// if cache.get::<String>(Scope::Device, "platform").is_none() {
///     cache.set(Scope::Device, "platform", detect_platform(), &CacheDuration::INFINITE);
/// }
/// cache.close()?;
/// ```
#[derive(Debug)]
pub struct CacheManager {
    config: CacheConfig,
    cache_dir: PathBuf,
    session_id: String,
    session: OnceLock<Store>,
    device: OnceLock<Store>,
}

impl CacheManager {
    /// Create a manager without loading any store yet.
    pub fn new(config: CacheConfig) -> Self {
        let cache_dir = match &config.cache_dir {
            Some(dir) => {
                let resolved = paths::resolve_cache_dir(Some(dir.as_path()));
                if &resolved != dir {
                    warn!(
                        requested = %dir.display(),
                        path = %resolved.display(),
                        "Cache directory could not be created, using fallback"
                    );
                }
                resolved
            }
            None => paths::cache_dir().to_path_buf(),
        };
        let session_id = match &config.session_id {
            Some(id) => session::resolve_session_id(Some(id.clone())),
            None => session::session_id().to_string(),
        };

        debug!(
            cache_dir = %cache_dir.display(),
            session_id = %session_id,
            backend = %config.backend,
            persist = config.persist,
            "Cache manager created"
        );

        Self {
            config,
            cache_dir,
            session_id,
            session: OnceLock::new(),
            device: OnceLock::new(),
        }
    }

    /// Create a manager and load both stores.
    pub fn init(config: CacheConfig) -> Self {
        let manager = Self::new(config);
        manager.store(Scope::Device);
        manager.store(Scope::Session);
        manager
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Backing file of `scope`.
    pub fn path_for(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Device => self.cache_dir.join(paths::device_file_name()),
            Scope::Session => self.cache_dir.join(paths::session_file_name(&self.session_id)),
        }
    }

    fn cell(&self, scope: Scope) -> &OnceLock<Store> {
        match scope {
            Scope::Session => &self.session,
            Scope::Device => &self.device,
        }
    }

    /// The store for `scope`, loading it on first use.
    pub fn store(&self, scope: Scope) -> &Store {
        self.cell(scope)
            .get_or_init(|| Store::load(scope, self.path_for(scope), &self.config))
    }

    /// Whether the store for `scope` has been loaded.
    pub fn is_loaded(&self, scope: Scope) -> bool {
        self.cell(scope).get().is_some()
    }

    pub fn get<T: Cacheable>(&self, scope: Scope, key: &str) -> Option<T> {
        self.store(scope).get(key)
    }

    pub fn set<T: Cacheable>(
        &self,
        scope: Scope,
        key: impl Into<String>,
        value: T,
        duration: &CacheDuration,
    ) {
        self.store(scope).set(key, value, duration);
    }

    pub fn delete(&self, scope: Scope, key: &str) {
        self.store(scope).delete(key);
    }

    pub fn delete_all(&self, scope: Scope) {
        self.store(scope).delete_all();
    }

    /// Persist every loaded, dirty store.
    ///
    /// Both stores are attempted even if the first fails; the first error is
    /// returned.
    pub fn close(self) -> Result<()> {
        let mut first_error: Option<Error> = None;

        for (scope, cell) in [(Scope::Device, self.device), (Scope::Session, self.session)] {
            let Some(store) = cell.into_inner() else {
                continue;
            };
            if let Err(e) = store.close() {
                warn!(scope = %scope, error = %e, "Failed to persist cache");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
