//! Error types for cache persistence operations.

use std::path::PathBuf;

/// Error type for cache persistence operations.
///
/// Lookups never produce these: a cache miss is always an acceptable outcome.
/// Only backend construction, writes and cleanup surface errors to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying file I/O failed.
    #[error("cache I/O failed for '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A mapped region larger than the hard ceiling was requested.
    #[error("requested cache capacity {requested} exceeds maximum {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// Content does not fit in the currently allocated mapped region.
    #[error("string too large for allocated space ({len} > {capacity})")]
    TooLarge { len: usize, capacity: usize },

    /// Stored bytes do not describe a valid layout.
    #[error("corrupted cache data: {0}")]
    Corrupted(String),

    /// Failed to encode the cache blob.
    #[error("failed to encode cache: {0}")]
    Encode(String),

    /// Failed to decode the cache blob (missing header, old format, garbage).
    #[error("failed to decode cache: {0}")]
    Decode(String),
}

impl Error {
    /// Wrap an I/O error with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for cache persistence operations.
pub type Result<T> = std::result::Result<T, Error>;
