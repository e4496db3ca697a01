//! Wildcard name matching
//!
//! Feature and feature-set name filters are wildcard patterns. Patterns
//! without a wildcard are compared exactly; the rest are translated to
//! anchored regular expressions and compiled at most once per matcher.

pub mod cache;
pub mod pattern;

pub use cache::PatternCache;
pub use pattern::WildcardPattern;

use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled-program size ceiling for a single pattern
pub const DEFAULT_SIZE_LIMIT: usize = 1 << 20;

/// Matches candidate strings against wildcard patterns
pub struct WildcardMatcher {
    wildcard: char,
    size_limit: usize,
    cache: Mutex<PatternCache>,
}

impl WildcardMatcher {
    pub fn new(wildcard: char, cache_capacity: usize) -> Self {
        WildcardMatcher {
            wildcard,
            size_limit: DEFAULT_SIZE_LIMIT,
            cache: Mutex::new(PatternCache::new(cache_capacity)),
        }
    }

    /// Override the compiled-program size ceiling
    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn wildcard(&self) -> char {
        self.wildcard
    }

    /// True if `pattern` contains this matcher's wildcard
    pub fn is_pattern(&self, pattern: &str) -> bool {
        WildcardPattern::has_wildcard(pattern, self.wildcard)
    }

    /// Match `candidate` against a single pattern
    ///
    /// # Examples
    /// ```
    /// use feature_store::wildcard::WildcardMatcher;
    ///
    /// let matcher = WildcardMatcher::new('%', 16);
    /// assert!(matcher.matches("road%", "road 66").unwrap());
    /// assert!(!matcher.matches("road", "road 66").unwrap());
    /// ```
    pub fn matches(&self, pattern: &str, candidate: &str) -> Result<bool> {
        if !self.is_pattern(pattern) {
            return Ok(pattern == candidate);
        }
        let regex = self.compiled(pattern)?;
        Ok(regex.is_match(candidate))
    }

    /// True if any pattern matches; an empty list matches everything
    pub fn matches_any<S: AsRef<str>>(&self, patterns: &[S], candidate: &str) -> Result<bool> {
        if patterns.is_empty() {
            return Ok(true);
        }
        for pattern in patterns {
            if self.matches(pattern.as_ref(), candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn compiled(&self, pattern: &str) -> Result<Regex> {
        let mut cache = self.cache.lock();
        if let Some(regex) = cache.get(pattern, self.wildcard) {
            return Ok(regex);
        }

        let source = WildcardPattern::to_regex(pattern, self.wildcard);
        match RegexBuilder::new(&source).size_limit(self.size_limit).build() {
            Ok(regex) => {
                cache.put(pattern, self.wildcard, regex.clone());
                Ok(regex)
            }
            Err(e) => {
                warn!("Failed to compile wildcard pattern '{}': {}", pattern, e);
                Err(StoreError::Internal(format!(
                    "invalid wildcard pattern '{}': {}",
                    pattern, e
                )))
            }
        }
    }
}

impl Default for WildcardMatcher {
    fn default() -> Self {
        WildcardMatcher::new('%', 256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_compare_without_wildcard() {
        let m = WildcardMatcher::default();
        assert!(m.matches("Main St.", "Main St.").unwrap());
        assert!(!m.matches("Main St.", "Main Sta").unwrap());
        assert_eq!(m.cache.lock().len(), 0);
    }

    #[test]
    fn test_patterns_are_cached() {
        let m = WildcardMatcher::default();
        assert!(m.matches("a%", "abc").unwrap());
        assert!(m.matches("a%", "axe").unwrap());
        assert!(!m.matches("a%", "bad").unwrap());
        assert_eq!(m.cache.lock().len(), 1);
    }

    #[test]
    fn test_matches_any() {
        let m = WildcardMatcher::default();
        let empty: [&str; 0] = [];
        assert!(m.matches_any(&empty, "anything").unwrap());
        assert!(m.matches_any(&["x%", "%gate"], "north gate").unwrap());
        assert!(!m.matches_any(&["x%", "%gate"], "north wall").unwrap());
    }

    #[test]
    fn test_compile_failure_is_an_error() {
        let m = WildcardMatcher::new('%', 4).with_size_limit(16);
        let pattern = format!("{}%", "x".repeat(512));
        let err = m.matches(&pattern, "xxx").unwrap_err();
        assert!(matches!(err, StoreError::Internal(_)));
        // exact compares never compile
        assert!(m.matches("xx", "xx").unwrap());
    }

    #[test]
    fn test_custom_wildcard() {
        let m = WildcardMatcher::new('*', 8);
        assert!(m.matches("*.shp", "roads.shp").unwrap());
        assert!(!m.matches("%.shp", "roads.shp").unwrap());
        assert_eq!(m.wildcard(), '*');
    }
}
