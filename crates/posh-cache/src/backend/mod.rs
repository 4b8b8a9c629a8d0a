//! Physical storage for store blobs.
//!
//! Two strategies share the [`Persistence`] contract:
//! - [`FileBackend`]: a regular file, read once and rewritten once
//! - [`MappedBackend`]: a memory-mapped, length-prefixed shared string
//!
//! [`Backend`] is the tagged variant the store works with; which one is used
//! by default depends on the build target.

mod file;
pub mod layout;
mod mapped;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use file::FileBackend;
pub use mapped::{MappedBackend, SharedString};

use crate::error::Result;

/// Read/write/close contract for a store's backing storage.
pub trait Persistence {
    /// Read the whole stored blob (empty when nothing is stored yet).
    fn read(&mut self) -> Result<Vec<u8>>;

    /// Replace the stored blob.
    fn write(&mut self, blob: &[u8]) -> Result<()>;

    /// Release the underlying OS resources.
    fn close(self) -> Result<()>;
}

/// Which storage strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    File,
    Mapped,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(windows) {
            BackendKind::Mapped
        } else {
            BackendKind::File
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::File => write!(f, "file"),
            BackendKind::Mapped => write!(f, "mapped"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "mapped" | "mmap" => Ok(BackendKind::Mapped),
            other => Err(format!("unknown cache backend '{other}' (expected file or mapped)")),
        }
    }
}

/// An open backend of either kind.
#[derive(Debug)]
pub enum Backend {
    File(FileBackend),
    Mapped(MappedBackend),
}

impl Backend {
    /// Open the backend of `kind` at `path`, creating the file if absent.
    ///
    /// `mapped_capacity` is only used by the mapped backend.
    pub fn open(kind: BackendKind, path: &Path, mapped_capacity: usize) -> Result<Self> {
        match kind {
            BackendKind::File => FileBackend::open(path).map(Backend::File),
            BackendKind::Mapped => MappedBackend::open(path, mapped_capacity).map(Backend::Mapped),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::File(_) => BackendKind::File,
            Backend::Mapped(_) => BackendKind::Mapped,
        }
    }
}

impl Persistence for Backend {
    fn read(&mut self) -> Result<Vec<u8>> {
        match self {
            Backend::File(b) => b.read(),
            Backend::Mapped(b) => b.read(),
        }
    }

    fn write(&mut self, blob: &[u8]) -> Result<()> {
        match self {
            Backend::File(b) => b.write(blob),
            Backend::Mapped(b) => b.write(blob),
        }
    }

    fn close(self) -> Result<()> {
        match self {
            Backend::File(b) => b.close(),
            Backend::Mapped(b) => b.close(),
        }
    }
}
