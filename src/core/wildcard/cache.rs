//! LRU cache of compiled wildcard patterns
//!
//! Query predicates test the same handful of patterns against every
//! candidate row; compiling once per distinct pattern keeps scans cheap.

use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;

/// Cache key for a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    pattern: String,
    wildcard: char,
}

/// LRU cache of compiled patterns
pub struct PatternCache {
    cache: LruCache<CacheKey, Regex>,
}

impl PatternCache {
    /// Create a new pattern cache; a capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        PatternCache {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a compiled pattern
    pub fn get(&mut self, pattern: &str, wildcard: char) -> Option<Regex> {
        let key = CacheKey {
            pattern: pattern.to_string(),
            wildcard,
        };
        self.cache.get(&key).cloned()
    }

    /// Store a compiled pattern
    pub fn put(&mut self, pattern: &str, wildcard: char, regex: Regex) {
        let key = CacheKey {
            pattern: pattern.to_string(),
            wildcard,
        };
        self.cache.put(key, regex);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
