//! Write-once caches.
//!
//! Resolution results (including failed ones) are computed at most once
//! per process and then replayed. The resolver is single-threaded, so
//! plain `RefCell`/`OnceCell` interior mutability is enough; the fill
//! closure must not re-enter the same cache for the same key.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;

/// A keyed write-once cache. The first computed value for a key is the
/// value for the rest of the process; later lookups clone it.
#[derive(Debug)]
pub struct Cache<K, V> {
    entries: RefCell<HashMap<K, V>>,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Cache {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Cache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it with `fill` on the
    /// first request.
    pub fn get_lazy(&self, key: &K, fill: impl FnOnce() -> V) -> V {
        if let Some(value) = self.entries.borrow().get(key) {
            return value.clone();
        }

        let value = fill();
        self.entries
            .borrow_mut()
            .entry(key.clone())
            .or_insert(value)
            .clone()
    }
}

/// A single write-once value.
#[derive(Debug, Default)]
pub struct CacheSingle<T> {
    value: OnceCell<T>,
}

impl<T: Clone> CacheSingle<T> {
    pub fn new() -> Self {
        CacheSingle {
            value: OnceCell::new(),
        }
    }

    pub fn get_lazy(&self, fill: impl FnOnce() -> T) -> T {
        self.value.get_or_init(fill).clone()
    }
}
