//! Memoization of computed calendrical events.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 512;

/// Cache of event times keyed by an integer (a year, or a month ordinal).
///
/// Strategies own their caches privately; a computed value for a key never
/// changes, so a stale read only ever costs a recomputation. The lock is
/// released while computing: two racing writers compute the same value and
/// the second insert is a no-op semantically.
pub struct EventCache {
    name: &'static str,
    entries: Mutex<LruCache<i64, i64>>,
}

impl EventCache {
    /// Creates an empty cache. `name` identifies it in trace output.
    pub fn new(name: &'static str) -> Self {
        // DEFAULT_CAPACITY is nonzero.
        let capacity = NonZeroUsize::new(DEFAULT_CAPACITY)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached value for `key`, computing and remembering it on
    /// a miss. `compute` must be a pure function of `key`.
    pub fn get_or_compute(&self, key: i64, compute: impl FnOnce() -> i64) -> i64 {
        if let Some(&value) = self.entries.lock().get(&key) {
            return value;
        }
        trace!(cache = self.name, key, "cache miss");
        let value = compute();
        self.entries.lock().put(key, value);
        value
    }
}

impl std::fmt::Debug for EventCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCache")
            .field("name", &self.name)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn computes_once_per_key() {
        let cache = EventCache::new("test");
        let calls = AtomicU32::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        };
        assert_eq!(42, cache.get_or_compute(7, compute));
        assert_eq!(42, cache.get_or_compute(7, compute));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn distinct_keys_distinct_values() {
        let cache = EventCache::new("test");
        assert_eq!(1, cache.get_or_compute(1, || 1));
        assert_eq!(2, cache.get_or_compute(2, || 2));
        assert_eq!(1, cache.get_or_compute(1, || panic!("cached")));
    }
}
