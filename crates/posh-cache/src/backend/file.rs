//! Plain read/write file backend.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use super::Persistence;
use crate::error::{Error, Result};

/// A regular file holding one cache blob.
///
/// The blob is read once when a store loads and rewritten in full when a
/// dirty store closes.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: File,
}

impl FileBackend {
    /// Open `path` for reading and writing, creating it if absent.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FileBackend {
    fn read(&mut self) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut blob))
            .map_err(|e| Error::io(&self.path, e))?;
        trace!(path = %self.path.display(), bytes = blob.len(), "Read cache file");
        Ok(blob)
    }

    fn write(&mut self, blob: &[u8]) -> Result<()> {
        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| self.file.write_all(blob))
            .and_then(|_| self.file.flush())
            .map_err(|e| Error::io(&self.path, e))?;
        trace!(path = %self.path.display(), bytes = blob.len(), "Wrote cache file");
        Ok(())
    }

    fn close(self) -> Result<()> {
        // Dropping the handle closes it.
        Ok(())
    }
}
