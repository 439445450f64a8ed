// registry.rs — Hook registry backed by immutable, swappable snapshots.
//
// The registry never mutates a hook list in place. Every write builds a
// complete new RegistrySnapshot and swaps the Arc under a short write
// lock. Readers clone the Arc and then work on that snapshot lock-free for
// the rest of the pipeline run, so a concurrent reload can never expose a
// half-updated rule set.
//
// Write path (register / reload / set_enabled / unregister):
//   1. Take the write lock (writes are serialized).
//   2. Build and validate the new snapshot. On error, nothing changes.
//   3. Swap it in, release the lock.
//   4. Invalidate pattern cache entries of hooks that were removed,
//      replaced, or disabled.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use hw_event::Event;

use crate::descriptor::PriorityTier;
use crate::error::RegistryError;
use crate::hook::RegisteredHook;
use crate::pattern_cache::PatternCache;

/// An immutable view of every registered hook, in registration order.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    version: u64,
    hooks: Vec<Arc<RegisteredHook>>,
}

impl RegistrySnapshot {
    /// Build a snapshot, refusing duplicate ids.
    fn build(version: u64, hooks: Vec<Arc<RegisteredHook>>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for hook in &hooks {
            if !seen.insert(hook.id()) {
                return Err(RegistryError::DuplicateHook {
                    id: hook.id().to_string(),
                });
            }
        }
        Ok(Self { version, hooks })
    }

    /// Monotonic version, bumped by every successful write.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All hooks (enabled or not) in registration order.
    pub fn hooks(&self) -> &[Arc<RegisteredHook>] {
        &self.hooks
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RegisteredHook>> {
        self.hooks.iter().find(|h| h.id() == id)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Enabled hooks whose phase and matcher accept `event`, ordered by
    /// priority tier, then registration order.
    ///
    /// A matcher that fails to compile is treated as not matching; it is a
    /// configuration problem, not a reason to block.
    pub fn hooks_for(&self, event: &Event, cache: &PatternCache) -> Vec<Arc<RegisteredHook>> {
        let mut matching: Vec<Arc<RegisteredHook>> = self
            .hooks
            .iter()
            .filter(|hook| {
                let d = &hook.descriptor;
                if !d.enabled || !d.phase.accepts(event.phase()) {
                    return false;
                }
                match d.matcher.matches(&d.id, event, cache) {
                    Ok(matched) => matched,
                    Err(e) => {
                        tracing::warn!(hook_id = %d.id, "matcher failed, skipping hook: {}", e);
                        false
                    }
                }
            })
            .cloned()
            .collect();

        // `sort_by_key` is stable, so registration order survives within a tier.
        matching.sort_by_key(|hook| hook.descriptor.priority_tier);
        matching
    }

    /// Count hooks per tier (enabled only). Used for status output.
    pub fn tier_counts(&self) -> HashMap<PriorityTier, usize> {
        let mut counts = HashMap::new();
        for hook in self.hooks.iter().filter(|h| h.descriptor.enabled) {
            *counts.entry(hook.descriptor.priority_tier).or_insert(0) += 1;
        }
        counts
    }
}

/// Process-wide hook registry.
pub struct HookRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    cache: Arc<PatternCache>,
}

impl HookRegistry {
    /// Create an empty registry with its own pattern cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(PatternCache::new()))
    }

    /// Create an empty registry sharing `cache` (rule hooks built by a
    /// factory usually hold the same cache).
    pub fn with_cache(cache: Arc<PatternCache>) -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            cache,
        }
    }

    /// Initialize a registry from a full hook set. Duplicate ids are fatal.
    pub fn from_hooks(
        hooks: Vec<RegisteredHook>,
        cache: Arc<PatternCache>,
    ) -> Result<Self, RegistryError> {
        let registry = Self::with_cache(cache);
        registry.reload(hooks)?;
        Ok(registry)
    }

    pub fn cache(&self) -> &Arc<PatternCache> {
        &self.cache
    }

    /// The current snapshot. Cheap: one Arc clone under a read lock.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Registered hook ids in registration order.
    pub fn list(&self) -> Vec<String> {
        self.snapshot()
            .hooks()
            .iter()
            .map(|h| h.id().to_string())
            .collect()
    }

    /// Matching hooks for `event` from the current snapshot.
    pub fn hooks_for(&self, event: &Event) -> Vec<Arc<RegisteredHook>> {
        self.snapshot().hooks_for(event, &self.cache)
    }

    /// Append one hook. Fails without effect if its id is already present.
    pub fn register(&self, hook: RegisteredHook) -> Result<(), RegistryError> {
        self.swap(|current| {
            if current.get(hook.id()).is_some() {
                return Err(RegistryError::DuplicateHook {
                    id: hook.id().to_string(),
                });
            }
            let mut hooks = current.hooks.clone();
            hooks.push(Arc::new(hook));
            Ok(hooks)
        })?;
        Ok(())
    }

    /// Replace the whole hook set atomically. Returns the new version.
    ///
    /// The new set is fully validated first; on error the previous
    /// snapshot stays live.
    pub fn reload(&self, hooks: Vec<RegisteredHook>) -> Result<u64, RegistryError> {
        let hooks: Vec<Arc<RegisteredHook>> = hooks.into_iter().map(Arc::new).collect();
        let version = self.swap(move |_| Ok(hooks))?;
        tracing::info!(version, "hook registry reloaded");
        Ok(version)
    }

    /// Enable or disable one hook.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        self.swap(|current| {
            let target = current.get(id).ok_or_else(|| RegistryError::UnknownHook {
                id: id.to_string(),
            })?;
            let mut toggled = RegisteredHook::clone(target);
            toggled.descriptor.enabled = enabled;
            let toggled = Arc::new(toggled);

            Ok(current
                .hooks
                .iter()
                .map(|h| {
                    if h.id() == id {
                        Arc::clone(&toggled)
                    } else {
                        Arc::clone(h)
                    }
                })
                .collect())
        })?;
        Ok(())
    }

    /// Remove one hook. Returns `true` if it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        self.swap(|current| {
            if current.get(id).is_none() {
                return Err(RegistryError::UnknownHook { id: id.to_string() });
            }
            Ok(current
                .hooks
                .iter()
                .filter(|h| h.id() != id)
                .cloned()
                .collect())
        })
        .is_ok()
    }

    /// Serialized read-modify-swap. `build` sees the current snapshot and
    /// returns the complete new hook list.
    fn swap<F>(&self, build: F) -> Result<u64, RegistryError>
    where
        F: FnOnce(&RegistrySnapshot) -> Result<Vec<Arc<RegisteredHook>>, RegistryError>,
    {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = Arc::clone(&current);
        let version = previous.version + 1;
        let next = Arc::new(RegistrySnapshot::build(version, build(&previous)?)?);
        *current = Arc::clone(&next);
        drop(current);

        self.invalidate_stale(&previous, &next);
        Ok(version)
    }

    /// Drop cached patterns of every hook that was removed or replaced.
    /// A replaced hook may carry a new evaluator (different rules) behind an
    /// identical descriptor, so identity decides, not descriptor equality.
    fn invalidate_stale(&self, previous: &RegistrySnapshot, next: &RegistrySnapshot) {
        for old in previous.hooks() {
            let stale = match next.get(old.id()) {
                None => true,
                Some(new) => !Arc::ptr_eq(new, old) || !new.descriptor.enabled,
            };
            if stale {
                self.cache.invalidate_hook(old.id());
            }
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
