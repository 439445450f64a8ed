// pattern_cache.rs — Lazily compiled, process-wide pattern cache.
//
// Matcher clauses and rule hooks compile regexes/globs on first use and
// keep them for the life of the process. A host that invokes the engine
// once per tool call would otherwise pay the compilation cost every time.
//
// Entries are keyed by (hook_id, pattern_id). Callers build pattern ids
// from the pattern source itself, so an entry compiled for an old
// descriptor can never be served for a new one; invalidation only frees
// memory.
//
// Reads take the shared lock. A miss takes the write lock, re-checks, and
// runs the builder at most once per key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::error::PatternError;

/// A compiled, immutable pattern. Shared across pipeline runs via `Arc`.
#[derive(Debug)]
pub enum CompiledPattern {
    Regex(Regex),
    Glob(Pattern),
}

impl CompiledPattern {
    /// Compile a regular expression.
    pub fn regex(source: &str) -> Result<Self, PatternError> {
        Regex::new(source)
            .map(CompiledPattern::Regex)
            .map_err(|e| PatternError::InvalidRegex {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// Compile a glob pattern.
    pub fn glob(source: &str) -> Result<Self, PatternError> {
        Pattern::new(source)
            .map(CompiledPattern::Glob)
            .map_err(|e| PatternError::InvalidGlob {
                pattern: source.to_string(),
                reason: e.msg.to_string(),
            })
    }

    /// Test `text` against the pattern.
    ///
    /// Globs require a literal `/` to match a path separator, so `src/*.rs`
    /// does not reach into `src/sub/`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Regex(re) => re.is_match(text),
            CompiledPattern::Glob(pattern) => {
                let opts = MatchOptions {
                    require_literal_separator: true,
                    ..Default::default()
                };
                pattern.matches_with(text, opts)
            }
        }
    }

    /// The underlying regex, if this is one.
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            CompiledPattern::Regex(re) => Some(re),
            CompiledPattern::Glob(_) => None,
        }
    }
}

type HookPatterns = HashMap<String, Arc<CompiledPattern>>;

/// Process-wide cache of compiled patterns.
#[derive(Debug, Default)]
pub struct PatternCache {
    /// hook_id → pattern_id → compiled pattern.
    entries: RwLock<HashMap<String, HookPatterns>>,
    /// Number of times a builder ran. Exposed for observability.
    compilations: AtomicU64,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled pattern for `(hook_id, pattern_id)`, compiling it
    /// with `builder` on first use.
    ///
    /// A failing builder leaves the cache unchanged.
    pub fn get_or_compile<F>(
        &self,
        hook_id: &str,
        pattern_id: &str,
        builder: F,
    ) -> Result<Arc<CompiledPattern>, PatternError>
    where
        F: FnOnce() -> Result<CompiledPattern, PatternError>,
    {
        if let Some(hit) = self.get(hook_id, pattern_id) {
            return Ok(hit);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another run may have compiled it while we waited for the write lock.
        if let Some(hit) = entries.get(hook_id).and_then(|p| p.get(pattern_id)) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(builder()?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        entries
            .entry(hook_id.to_string())
            .or_default()
            .insert(pattern_id.to_string(), Arc::clone(&compiled));
        tracing::trace!(hook_id, pattern_id, "compiled pattern");
        Ok(compiled)
    }

    /// Look up an entry without compiling.
    pub fn get(&self, hook_id: &str, pattern_id: &str) -> Option<Arc<CompiledPattern>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(hook_id)
            .and_then(|patterns| patterns.get(pattern_id))
            .map(Arc::clone)
    }

    /// Drop every entry belonging to `hook_id`. Returns how many were dropped.
    pub fn invalidate_hook(&self, hook_id: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.remove(hook_id).map(|p| p.len()).unwrap_or(0);
        if dropped > 0 {
            tracing::debug!(hook_id, dropped, "invalidated cached patterns");
        }
        dropped
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Total number of cached patterns across all hooks.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn builder_runs_once_per_key() {
        let cache = PatternCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_compile("hook-a", "p1", || {
                calls += 1;
                CompiledPattern::regex("_improved")
            })
            .unwrap();
        let second = cache
            .get_or_compile("hook-a", "p1", || {
                calls += 1;
                CompiledPattern::regex("_improved")
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn failing_builder_is_not_cached() {
        let cache = PatternCache::new();
        let err = cache
            .get_or_compile("hook-a", "bad", || CompiledPattern::regex("(unclosed"))
            .unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
        assert!(cache.is_empty());
        assert_eq!(cache.compilations(), 0);
    }

    #[test]
    fn invalidate_drops_only_that_hook() {
        let cache = PatternCache::new();
        cache
            .get_or_compile("hook-a", "p1", || CompiledPattern::regex("a"))
            .unwrap();
        cache
            .get_or_compile("hook-a", "p2", || CompiledPattern::regex("b"))
            .unwrap();
        cache
            .get_or_compile("hook-b", "p1", || CompiledPattern::regex("c"))
            .unwrap();

        assert_eq!(cache.invalidate_hook("hook-a"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("hook-a", "p1").is_none());
        assert!(cache.get("hook-b", "p1").is_some());
        assert_eq!(cache.invalidate_hook("hook-a"), 0);
    }

    #[test]
    fn glob_requires_literal_separator() {
        let pattern = CompiledPattern::glob("src/*.rs").unwrap();
        assert!(pattern.is_match("src/lib.rs"));
        assert!(!pattern.is_match("src/sub/deep.rs"));

        let deep = CompiledPattern::glob("**/*.rs").unwrap();
        assert!(deep.is_match("src/sub/deep.rs"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        assert!(matches!(
            CompiledPattern::glob("[unclosed"),
            Err(PatternError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn concurrent_readers_share_one_compilation() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache
                        .get_or_compile("hook-a", "shared", || CompiledPattern::regex("x+"))
                        .unwrap()
                        .is_match("xxx")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.compilations(), 1);
    }
}
