//! Thread-safe string-keyed map.

use std::collections::HashMap;

use parking_lot::RwLock;

/// A `RwLock`-guarded map safe to share between threads.
///
/// Writers (`set`, `delete`, `clear`) take the exclusive lock, readers take the
/// shared lock, so no reader observes a half-written value. Concurrent `set`s
/// of the same key resolve last-writer-wins.
#[derive(Debug)]
pub struct ConcurrentMap<V> {
    inner: RwLock<HashMap<String, V>>,
}

impl<V: Clone> ConcurrentMap<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// Insert or replace the value under `key`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.write().insert(key.into(), value);
    }

    /// Remove `key`, returning the previous value if any.
    pub fn delete(&self, key: &str) -> Option<V> {
        self.inner.write().remove(key)
    }

    /// Remove `key` only if `predicate` holds for its current value.
    ///
    /// The check and removal happen under one exclusive lock, so a value
    /// replaced concurrently is not removed by mistake.
    pub fn delete_if<F>(&self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        let mut inner = self.inner.write();
        if inner.get(key).is_some_and(predicate) {
            inner.remove(key);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Shallow copy of the whole map, taken under the shared lock.
    ///
    /// The lock is released before returning, so callers can serialize the
    /// snapshot without blocking writers.
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.inner.read().clone()
    }
}

impl<V: Clone> Default for ConcurrentMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
