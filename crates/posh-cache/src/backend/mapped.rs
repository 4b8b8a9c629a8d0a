//! Growable memory-mapped shared string backend.
//!
//! Keeps one length-prefixed byte string (see [`layout`](super::layout)) in a
//! file mapped into memory. Used where setting up and tearing down file
//! handles on every prompt is slower than touching a mapped view.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, warn};

use super::Persistence;
use super::layout::{self, MAX_CAPACITY, MIN_CAPACITY};
use crate::error::{Error, Result};

/// A single string persisted in a memory-mapped file.
#[derive(Debug)]
pub struct SharedString {
    path: PathBuf,
    file: File,
    map: MmapMut,
    capacity: usize,
}

impl SharedString {
    /// Open the shared string at `path` with at least `capacity` content bytes.
    ///
    /// The capacity is raised to [`MIN_CAPACITY`]; anything above
    /// [`MAX_CAPACITY`] is refused. An existing file that is large enough is
    /// reused with its content; a smaller one is replaced.
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        let capacity = layout::normalize_capacity(capacity)?;

        match Self::open_existing(path, capacity) {
            Ok(Some(shared)) => return Ok(shared),
            Ok(None) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to reuse mapped cache file, recreating");
            }
        }

        Self::create(path, capacity)
    }

    /// Create (or truncate and recreate) the file with exactly `capacity`
    /// content bytes and an empty string.
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        let capacity = layout::normalize_capacity(capacity)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        file.set_len(layout::region_len(capacity) as u64)
            .map_err(|e| Error::io(path, e))?;

        let mut shared = Self::map(path, file, capacity)?;
        layout::write_content(&mut shared.map, b"")?;
        debug!(path = %path.display(), capacity, "Created mapped cache file");
        Ok(shared)
    }

    fn open_existing(path: &Path, capacity: usize) -> Result<Option<Self>> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
        let existing = usize::try_from(len).ok().and_then(layout::capacity_of);
        match existing {
            Some(existing) if existing >= capacity && existing <= MAX_CAPACITY => {
                debug!(path = %path.display(), capacity = existing, "Reusing mapped cache file");
                Self::map(path, file, existing).map(Some)
            }
            _ => {
                debug!(
                    path = %path.display(),
                    file_len = len,
                    requested = capacity,
                    "Existing mapped cache file has the wrong size"
                );
                Ok(None)
            }
        }
    }

    fn map(path: &Path, file: File, capacity: usize) -> Result<Self> {
        // SAFETY: the file stays open for the lifetime of the map and is only
        // resized before mapping or after unmapping. Writers in other processes
        // are not coordinated; last writer wins, as with the file backend.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| Error::io(path, e))?;
        if map.len() != layout::region_len(capacity) {
            return Err(Error::Corrupted(format!(
                "mapped {} bytes, expected {}",
                map.len(),
                layout::region_len(capacity)
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            capacity,
        })
    }

    /// Content bytes available in the current allocation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored string.
    ///
    /// Fails with [`Error::TooLarge`] when `value` exceeds the capacity, in
    /// which case the previous content is left untouched.
    pub fn set_string(&mut self, value: &[u8]) -> Result<()> {
        layout::write_content(&mut self.map, value)
    }

    /// Copy of the stored string; empty when nothing valid is stored.
    pub fn bytes(&self) -> Vec<u8> {
        match layout::read_content(&self.map) {
            Ok(content) => content.to_vec(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable mapped cache");
                Vec::new()
            }
        }
    }

    /// Flush and release the view and the file handle.
    ///
    /// Every step runs even if an earlier one failed; the first error is
    /// returned.
    pub fn close(self) -> Result<()> {
        let Self { path, file, map, .. } = self;
        let mut first_error = None;

        if let Err(e) = map.flush() {
            first_error = Some(Error::io(&path, e));
        }
        drop(map);

        if let Err(e) = file.sync_all()
            && first_error.is_none()
        {
            first_error = Some(Error::io(&path, e));
        }
        drop(file);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// [`Persistence`] over a [`SharedString`] that grows on demand.
#[derive(Debug)]
pub struct MappedBackend {
    path: PathBuf,
    shared: Option<SharedString>,
}

impl MappedBackend {
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            shared: Some(SharedString::open(path, capacity)?),
        })
    }

    /// Current content capacity, zero after a failed regrowth.
    pub fn capacity(&self) -> usize {
        self.shared.as_ref().map_or(0, SharedString::capacity)
    }

    /// Replace the mapping with a larger one able to hold `len` bytes.
    fn grow(&mut self, len: usize) -> Result<&mut SharedString> {
        if len > MAX_CAPACITY {
            return Err(Error::CapacityExceeded {
                requested: len,
                max: MAX_CAPACITY,
            });
        }

        let capacity = (len + len / 2).clamp(MIN_CAPACITY, MAX_CAPACITY);
        debug!(
            path = %self.path.display(),
            len,
            current = self.capacity(),
            capacity,
            "Cache blob exceeds mapped allocation, recreating"
        );

        if let Some(old) = self.shared.take()
            && let Err(e) = old.close()
        {
            warn!(path = %self.path.display(), error = %e, "Failed to release mapped cache before regrowth");
        }

        Ok(self.shared.insert(SharedString::create(&self.path, capacity)?))
    }
}

impl Persistence for MappedBackend {
    fn read(&mut self) -> Result<Vec<u8>> {
        Ok(self.shared.as_ref().map(SharedString::bytes).unwrap_or_default())
    }

    fn write(&mut self, blob: &[u8]) -> Result<()> {
        if let Some(shared) = self.shared.as_mut()
            && blob.len() <= shared.capacity()
        {
            return shared.set_string(blob);
        }
        self.grow(blob.len())?.set_string(blob)
    }

    fn close(self) -> Result<()> {
        match self.shared {
            Some(shared) => shared.close(),
            None => Ok(()),
        }
    }
}
