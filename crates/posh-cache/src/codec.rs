//! Whole-map binary encoding of a store.
//!
//! Blob layout: the magic bytes `PSHC`, one format version byte, then the
//! bincode encoding of `HashMap<String, Entry>`. Anything else (an empty
//! file, an older format, truncated data) fails to decode and the caller
//! treats the store as absent.

use std::collections::HashMap;

use crate::entry::Entry;
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"PSHC";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// Encode a snapshot of a store into one blob.
pub fn encode(entries: &HashMap<String, Entry>) -> Result<Vec<u8>> {
    let body = bincode::serialize(entries).map_err(|e| Error::Encode(e.to_string()))?;
    let mut blob = Vec::with_capacity(HEADER_LEN + body.len());
    blob.extend_from_slice(MAGIC);
    blob.push(FORMAT_VERSION);
    blob.extend_from_slice(&body);
    Ok(blob)
}

/// Decode a blob produced by [`encode`].
pub fn decode(blob: &[u8]) -> Result<HashMap<String, Entry>> {
    if blob.len() < HEADER_LEN {
        return Err(Error::Decode(format!(
            "blob of {} bytes is shorter than the header",
            blob.len()
        )));
    }
    let (header, body) = blob.split_at(HEADER_LEN);
    if &header[..MAGIC.len()] != MAGIC {
        return Err(Error::Decode("unrecognized cache format".to_string()));
    }
    let version = header[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(Error::Decode(format!(
            "unsupported cache format version {version}"
        )));
    }
    bincode::deserialize(body).map_err(|e| Error::Decode(e.to_string()))
}
