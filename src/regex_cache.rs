//! Bounded (pattern, flags) -> compiled regex cache.
//!
//! `IGNORECASE` can flip at runtime, so the cache key carries the
//! compilation flags alongside the pattern text (§4.10, §9) rather than
//! the pattern alone.

use std::collections::HashMap;

use regex_lite::{Regex, RegexBuilder};

use crate::error::RuntimeError;

/// Default bound before the cache starts evicting. Chosen generously
/// since a typical AWK program uses a handful of distinct patterns;
/// this only guards against pathological dynamic-regex workloads
/// (e.g. building a fresh pattern string per record in a tight loop).
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    pattern: String,
    ignorecase: bool,
}

/// A bounded map from `(pattern, ignorecase)` to a compiled ERE.
/// Eviction policy on overflow is simple clear-on-full (§9 notes this
/// is an accepted open question), which keeps the policy deterministic
/// for a given sequence of insertions without tracking access order.
pub struct RegexCache {
    entries: HashMap<CacheKey, Regex>,
    capacity: usize,
}

impl RegexCache {
    pub fn new() -> Self {
        RegexCache {
            entries: HashMap::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RegexCache {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub fn get_or_compile(&mut self, pattern: &str, ignorecase: bool) -> Result<Regex, RuntimeError> {
        let key = CacheKey {
            pattern: pattern.to_string(),
            ignorecase,
        };
        if let Some(re) = self.entries.get(&key) {
            return Ok(re.clone());
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(ignorecase)
            .build()
            .map_err(|e| RuntimeError::BadRegex(pattern.to_string(), e.to_string()))?;
        if self.entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "regex cache full, evicting");
            self.entries.clear();
        }
        self.entries.insert(key, re.clone());
        Ok(re)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_pattern() {
        let mut cache = RegexCache::new();
        let a = cache.get_or_compile("a+", false).unwrap();
        let b = cache.get_or_compile("a+", false).unwrap();
        assert!(a.is_match("aaa"));
        assert!(b.is_match("aaa"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ignorecase_is_part_of_the_key() {
        let mut cache = RegexCache::new();
        cache.get_or_compile("abc", false).unwrap();
        cache.get_or_compile("abc", true).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evicts_when_full() {
        let mut cache = RegexCache::with_capacity(2);
        cache.get_or_compile("a", false).unwrap();
        cache.get_or_compile("b", false).unwrap();
        cache.get_or_compile("c", false).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let mut cache = RegexCache::new();
        assert!(cache.get_or_compile("(unclosed", false).is_err());
    }
}
