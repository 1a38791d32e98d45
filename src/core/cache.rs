//! Memoised search results for the lifetime of a session.

use std::collections::HashMap;
use std::sync::Arc;

use super::Entry;

/// Identifies one cached result list.
///
/// By default only the literal query string takes part in the key, so a
/// query repeated after navigating elsewhere is answered from the cache.
/// A path-scoped cache includes the directory the search ran in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: Option<String>,
    query: String,
}

/// Hit/miss counters, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct ListingCache {
    entries: HashMap<CacheKey, Arc<Vec<Entry>>>,
    scope_to_path: bool,
    stats: CacheStats,
}

impl ListingCache {
    pub fn new(scope_to_path: bool) -> Self {
        Self {
            scope_to_path,
            ..Self::default()
        }
    }

    fn key(&self, path: &str, query: &str) -> CacheKey {
        CacheKey {
            scope: self.scope_to_path.then(|| path.to_string()),
            query: query.to_string(),
        }
    }

    /// Looks up a previous result. The returned `Arc` is the same instance
    /// that was stored.
    pub fn get(&mut self, path: &str, query: &str) -> Option<Arc<Vec<Entry>>> {
        let key = self.key(path, query);
        match self.entries.get(&key) {
            Some(results) => {
                self.stats.hits += 1;
                Some(Arc::clone(results))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, path: &str, query: &str, results: Vec<Entry>) -> Arc<Vec<Entry>> {
        let results = Arc::new(results);
        let key = self.key(path, query);
        self.entries.insert(key, Arc::clone(&results));
        results
    }

    pub fn contains(&self, path: &str, query: &str) -> bool {
        self.entries.contains_key(&self.key(path, query))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
