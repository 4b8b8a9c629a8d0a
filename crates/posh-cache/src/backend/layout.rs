//! Byte layout of the memory-mapped shared string.
//!
//! ```text
//! +----------------+---------------------+------+----------------+
//! | len: u32 (LE)  | content (len bytes) | 0x00 | unused slack   |
//! +----------------+---------------------+------+----------------+
//! |<------------------- capacity + 5 bytes --------------------->|
//! ```
//!
//! Every access to the mapped region goes through these functions, which only
//! ever see a bounds-checked `&[u8]` / `&mut [u8]`.

use crate::error::{Error, Result};

/// Size of the little-endian length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;
/// Size of the NUL terminator written after the content.
pub const TERMINATOR_LEN: usize = 1;
/// Bytes of a region not available for content.
pub const OVERHEAD: usize = LENGTH_PREFIX_LEN + TERMINATOR_LEN;

/// Smallest content capacity ever allocated (50 KiB).
pub const MIN_CAPACITY: usize = 50 * 1024;
/// Largest content capacity that may be requested (10 MiB).
pub const MAX_CAPACITY: usize = 10 * 1024 * 1024;

/// Clamp a requested capacity to the minimum, rejecting anything above the
/// maximum.
pub fn normalize_capacity(requested: usize) -> Result<usize> {
    if requested > MAX_CAPACITY {
        return Err(Error::CapacityExceeded {
            requested,
            max: MAX_CAPACITY,
        });
    }
    Ok(requested.max(MIN_CAPACITY))
}

/// Total region size needed for `capacity` content bytes.
pub fn region_len(capacity: usize) -> usize {
    capacity + OVERHEAD
}

/// Content capacity of a region of `region_len` bytes.
pub fn capacity_of(region_len: usize) -> Option<usize> {
    region_len.checked_sub(OVERHEAD)
}

/// Borrow the stored content of a region.
pub fn read_content(region: &[u8]) -> Result<&[u8]> {
    let capacity = capacity_of(region.len()).ok_or_else(|| {
        Error::Corrupted(format!("region of {} bytes has no room for a header", region.len()))
    })?;

    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    prefix.copy_from_slice(&region[..LENGTH_PREFIX_LEN]);
    let len = u32::from_le_bytes(prefix) as usize;

    if len > capacity {
        return Err(Error::Corrupted(format!(
            "stored length {len} exceeds capacity {capacity}"
        )));
    }

    Ok(&region[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + len])
}

/// Store `content` in a region.
///
/// Fails without touching the region when the content does not fit. The
/// content and terminator are written before the length prefix.
pub fn write_content(region: &mut [u8], content: &[u8]) -> Result<()> {
    let capacity = capacity_of(region.len()).ok_or_else(|| {
        Error::Corrupted(format!("region of {} bytes has no room for a header", region.len()))
    })?;

    let len = content.len();
    let prefix = match u32::try_from(len) {
        Ok(prefix) if len <= capacity => prefix,
        _ => return Err(Error::TooLarge { len, capacity }),
    };

    region[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + len].copy_from_slice(content);
    region[LENGTH_PREFIX_LEN + len] = 0;
    region[..LENGTH_PREFIX_LEN].copy_from_slice(&prefix.to_le_bytes());
    Ok(())
}
