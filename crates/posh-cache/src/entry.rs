//! Stored cache entries and their expiry rule.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A stored value with its creation time and TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The cached payload.
    pub value: Value,

    /// Unix timestamp (seconds) of the `set` that created this entry.
    pub timestamp: i64,

    /// Time-to-live in seconds; negative means the entry never expires.
    pub ttl: i64,
}

impl Entry {
    pub fn new(value: Value, timestamp: i64, ttl: i64) -> Self {
        Self {
            value,
            timestamp,
            ttl,
        }
    }

    /// Whether the entry is stale at `now` (unix seconds).
    pub fn expired_at(&self, now: i64) -> bool {
        if self.ttl < 0 {
            return false;
        }
        now >= self.timestamp.saturating_add(self.ttl)
    }

    /// Expiry instant in unix seconds, `None` for immortal entries.
    pub fn expires_at(&self) -> Option<i64> {
        (self.ttl >= 0).then(|| self.timestamp.saturating_add(self.ttl))
    }
}
