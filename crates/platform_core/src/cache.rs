//! Time-bound memoization of detection results
//!
//! Entries expire after a fixed TTL and are evicted lazily by the lookup that
//! observes them. There is no background sweep. The LRU bound keeps memory
//! flat under a high volume of distinct domains.

use crate::DetectionResult;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Storage for detection results keyed by domain
pub trait DetectionCache: Send + Sync {
    /// Return a live result for `domain`, if any
    fn lookup(&self, domain: &str) -> Option<DetectionResult>;

    /// Store `result` under `domain` with a fresh TTL
    fn store(&self, domain: &str, result: DetectionResult);

    /// Drop every entry
    fn clear(&self);

    /// Number of stored entries, expired ones included until observed
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry {
    result: DetectionResult,
    expires_at: Instant,
}

/// In-memory TTL cache with an LRU capacity bound
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl TtlCache {
    /// Create a cache holding at most `capacity` domains for `ttl` each
    ///
    /// A zero capacity is bumped to one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl DetectionCache for TtlCache {
    fn lookup(&self, domain: &str) -> Option<DetectionResult> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(domain) {
            Some(entry) if Instant::now() <= entry.expires_at => {
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry for {} expired, evicting", domain);
            entries.pop(domain);
        }

        None
    }

    fn store(&self, domain: &str, result: DetectionResult) {
        let entry = CacheEntry {
            result,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().put(domain.to_string(), entry);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
