//! Memoized compile results.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Compiled output keyed by the full source text.
///
/// Shared between threads compiling different files; a result is only ever
/// valid for the registry and options it was compiled with, so owners clear
/// it when either changes.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: Mutex<FxHashMap<String, Arc<str>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, Arc<str>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, source: &str) -> Option<Arc<str>> {
        let found = self.lock().get(source).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, source: &str, compiled: Arc<str>) {
        self.lock().insert(source.to_string(), compiled);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hits_and_misses() {
        let cache = CompileCache::new();
        assert_eq!(cache.get("<a:b/>"), None);
        cache.insert("<a:b/>", Arc::from("compiled"));
        assert_eq!(cache.get("<a:b/>").as_deref(), Some("compiled"));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
