// The calling layer memoizes the last computed tabulation for a short
// while. The cache is an explicit object with an explicit TTL and an
// explicit invalidation call; the engine itself stays a pure function of
// its input.

use std::time::{Duration, Instant};

use log::debug;
use serde_json::Value as JSValue;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    computed_at: Instant,
    value: JSValue,
}

/// A single-slot TTL cache for the tabulated dashboard JSON.
#[derive(Debug, Clone)]
pub struct ResultCache {
    ttl: Duration,
    slot: Option<CacheEntry>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> ResultCache {
        ResultCache { ttl, slot: None }
    }

    pub fn with_default_ttl() -> ResultCache {
        ResultCache::new(DEFAULT_TTL)
    }

    /// Returns the cached value when it is still fresh. A refresh request
    /// bypasses the cache and drops the stale entry.
    pub fn lookup(&mut self, refresh: bool) -> Option<JSValue> {
        if refresh {
            debug!("lookup: refresh requested, dropping the cached tabulation");
            self.invalidate();
            return None;
        }
        match &self.slot {
            Some(entry) if entry.computed_at.elapsed() <= self.ttl => {
                debug!("lookup: serving the cached tabulation");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("lookup: the cached tabulation expired");
                self.invalidate();
                None
            }
            None => None,
        }
    }

    pub fn store(&mut self, value: JSValue) {
        self.slot = Some(CacheEntry {
            computed_at: Instant::now(),
            value,
        });
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serves_a_fresh_entry() {
        let mut cache = ResultCache::new(Duration::from_secs(3600));
        assert_eq!(cache.lookup(false), None);
        cache.store(json!({"x": 1}));
        assert_eq!(cache.lookup(false), Some(json!({"x": 1})));
    }

    #[test]
    fn refresh_bypasses_the_cache() {
        let mut cache = ResultCache::new(Duration::from_secs(3600));
        cache.store(json!({"x": 1}));
        assert_eq!(cache.lookup(true), None);
        // The entry is gone entirely, not just skipped once.
        assert_eq!(cache.lookup(false), None);
    }

    #[test]
    fn entries_expire() {
        let mut cache = ResultCache::new(Duration::ZERO);
        cache.store(json!({"x": 1}));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.lookup(false), None);
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let mut cache = ResultCache::new(Duration::from_secs(3600));
        cache.store(json!({"x": 1}));
        cache.invalidate();
        assert_eq!(cache.lookup(false), None);
    }
}
