//! Two-tier TTL cache for the posh prompt renderer.
//!
//! Values live in one of two scopes:
//! - [`Scope::Session`]: private to one shell session, one file per session id
//! - [`Scope::Device`]: shared by every session of the user on this machine
//!
//! Each scope is an in-memory map loaded from its backing file on first use
//! and written back once, on [`CacheManager::close`], if anything changed.
//! Backing files are either plain files or fixed-size memory-mapped regions
//! (see [`BackendKind`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use posh_cache::{CacheConfig, CacheDuration, CacheManager, Scope};
//!
//! let cache = CacheManager::new(CacheConfig::default());
//! let branch: Option<String> = cache.get(Scope::Session, "git_branch");
//! if branch.is_none() {
//!     cache.set(Scope::Session, "git_branch", "main", &CacheDuration::ONE_MINUTE);
//! }
//! cache.close()?;
//! ```

pub mod backend;
mod clear;
mod codec;
mod config;
mod duration;
mod entry;
mod error;
mod manager;
mod map;
pub mod paths;
mod segment;
pub mod session;
mod store;
mod value;

pub use backend::{Backend, BackendKind, FileBackend, MappedBackend, Persistence, SharedString};
pub use clear::{ClearResult, RETENTION_DAYS, clear, clear_before};
pub use codec::{decode, encode};
pub use config::{CACHE_DIR_ENV, CacheConfig, Clock, SESSION_ID_ENV};
pub use duration::CacheDuration;
pub use entry::Entry;
pub use error::{Error, Result};
pub use manager::CacheManager;
pub use map::ConcurrentMap;
pub use segment::{AsyncSegmentData, SegmentCache};
pub use store::{Scope, Store};
pub use value::{Cacheable, Json, Value};
