//! Cache helpers for prompt segments rendered in the background.
//!
//! A segment whose data is slow to compute renders from the last cached
//! result while a background process refreshes it. The process marks itself
//! running so that the next prompt does not spawn a second one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::duration::CacheDuration;
use crate::store::Store;
use crate::value::{Json, Value};

const RUNNING: &str = "running";

/// Last rendered output of an asynchronous segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncSegmentData {
    pub text: String,
    pub enabled: bool,
    pub timestamp: DateTime<Utc>,
    /// How long the data stays valid; also the cache TTL of the entry.
    pub duration: CacheDuration,
}

impl AsyncSegmentData {
    /// Data rendered now.
    pub fn new(text: impl Into<String>, enabled: bool, duration: CacheDuration) -> Self {
        Self {
            text: text.into(),
            enabled,
            timestamp: Utc::now(),
            duration,
        }
    }
}

/// Segment data and process markers kept in one [`Store`].
#[derive(Debug, Clone, Copy)]
pub struct SegmentCache<'a> {
    store: &'a Store,
}

impl<'a> SegmentCache<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Cached data for `segment`/`key`, or `None` if missing, expired or
    /// unreadable.
    pub fn segment_data(&self, segment: &str, key: &str) -> Option<AsyncSegmentData> {
        let Json(data) = self.store.get::<Json<AsyncSegmentData>>(&segment_key(segment, key))?;
        Some(data)
    }

    /// Cache `data` for its own duration.
    pub fn set_segment_data(&self, segment: &str, key: &str, data: AsyncSegmentData) {
        let duration = data.duration.clone();
        self.store
            .set(segment_key(segment, key), Json(data), &duration);
    }

    pub fn delete_segment_data(&self, segment: &str, key: &str) {
        self.store.delete(&segment_key(segment, key));
    }

    /// Whether a refresh for `segment`/`key` is marked running.
    pub fn is_process_running(&self, segment: &str, key: &str) -> bool {
        self.store.get::<Value>(&process_key(segment, key)).is_some()
    }

    /// Mark a refresh as running. The marker lapses after five minutes so a
    /// crashed process does not block refreshes forever.
    pub fn set_process_running(&self, segment: &str, key: &str) {
        debug!(segment = %segment, key = %key, "Marking segment refresh running");
        self.store
            .set(process_key(segment, key), RUNNING, &CacheDuration::FIVE_MINUTES);
    }

    pub fn clear_process_running(&self, segment: &str, key: &str) {
        self.store.delete(&process_key(segment, key));
    }
}

fn segment_key(segment: &str, key: &str) -> String {
    format!("async_segment_{segment}_{key}")
}

fn process_key(segment: &str, key: &str) -> String {
    format!("async_process_{segment}_{key}")
}
