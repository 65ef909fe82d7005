//! Per-file resolution caches.
//!
//! A [`ResolutionCache`] maps a containing file's [`CanonicalKey`] to the
//! resolutions of every name that file referenced in its most recent batch.
//! Each batch builds a fresh per-file map and swaps it in whole, so names a
//! file stopped referencing fall out of the cache on the next pass.
//!
//! Reuse is decided by [`is_resolution_valid`]. A resolved target is trusted
//! until the entry is explicitly removed or the whole table is cleared, even if
//! the target file disappears in the meantime.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::path_key::CanonicalKey;
use crate::resolution::Resolution;

/// Resolutions of one containing file, keyed by the literal referenced name.
pub type PerFileResolutions<T> = FxHashMap<String, Arc<T>>;

/// Counters describing how batches were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionCacheStats {
    /// Names served from the previous pass's entry
    pub reused: u64,
    /// Names repeated within one batch and served from that batch
    pub duplicates: u64,
    /// Names that went to the loader
    pub loader_invocations: u64,
    /// Loader invocations caused by a provisional not-found in the old entry
    pub retried_misses: u64,
}

/// Result of one batch resolution.
#[derive(Debug, Clone)]
pub struct BatchResolution<R> {
    /// One slot per input name, in input order
    pub resolutions: Vec<Option<R>>,
    /// Whether some freshly loaded result differs from the one it replaced
    pub changed: bool,
}

/// Decide whether a cached resolution may be reused without re-probing.
pub fn is_resolution_valid<T: Resolution>(resolution: Option<&T>) -> bool {
    let Some(resolution) = resolution else {
        return false;
    };

    if resolution.resolved().is_some() {
        return true;
    }

    // Nothing was probed, so nothing that could appear later was missed.
    resolution.failed_lookup_locations().is_empty()
}

fn resolution_is_equal_to<T: Resolution>(old: Option<&T>, new: &T) -> bool {
    let Some(old) = old else {
        return false;
    };
    match (old.resolved(), new.resolved()) {
        (None, None) => true,
        (Some(_), Some(_)) => old.resolved_file_name() == new.resolved_file_name(),
        _ => false,
    }
}

/// Global table from containing file to its per-file resolutions.
#[derive(Debug)]
pub struct ResolutionCache<T> {
    kind: &'static str,
    files: FxHashMap<CanonicalKey, Arc<PerFileResolutions<T>>>,
    stats: ResolutionCacheStats,
}

impl<T: Resolution> ResolutionCache<T> {
    /// `kind` only labels log output.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            files: FxHashMap::default(),
            stats: ResolutionCacheStats::default(),
        }
    }

    /// Resolve `names` for the file identified by `key`.
    ///
    /// The loader runs at most once per distinct name, and only for names the
    /// previous entry cannot serve. The file's entry is replaced by exactly the
    /// names of this batch once the batch completes.
    pub fn resolve_names<S, F>(
        &mut self,
        key: CanonicalKey,
        names: &[S],
        mut loader: F,
    ) -> BatchResolution<T::Resolved>
    where
        S: AsRef<str>,
        F: FnMut(&str) -> T,
    {
        let _span = tracing::debug_span!(
            "resolve_names",
            kind = self.kind,
            file = %key,
            names = names.len()
        )
        .entered();

        let previous = self.files.get(&key).cloned();
        let mut fresh: PerFileResolutions<T> =
            FxHashMap::with_capacity_and_hasher(names.len(), Default::default());
        let mut resolutions = Vec::with_capacity(names.len());
        let mut changed = false;

        for name in names {
            let name = name.as_ref();

            if fresh.contains_key(name) {
                self.stats.duplicates += 1;
            } else {
                let existing = previous.as_ref().and_then(|entry| entry.get(name));
                let resolution = match existing {
                    Some(existing) if is_resolution_valid(Some(existing.as_ref())) => {
                        trace!(name, "reusing cached resolution");
                        self.stats.reused += 1;
                        Arc::clone(existing)
                    }
                    _ => {
                        if existing.is_some() {
                            debug!(name, "retrying resolution with failed lookups");
                            self.stats.retried_misses += 1;
                        }
                        self.stats.loader_invocations += 1;
                        let loaded = Arc::new(loader(name));
                        if !resolution_is_equal_to(existing.map(|existing| &**existing), &*loaded) {
                            changed = true;
                        }
                        loaded
                    }
                };
                fresh.insert(name.to_string(), resolution);
            }

            let Some(resolution) = fresh.get(name) else {
                unreachable!("resolution for '{name}' missing after loading");
            };
            resolutions.push(resolution.resolved().cloned());
        }

        self.files.insert(key, Arc::new(fresh));

        BatchResolution {
            resolutions,
            changed,
        }
    }

    /// Drop the entry for one containing file. Absent entries are ignored.
    pub fn remove(&mut self, key: &CanonicalKey) -> bool {
        let removed = self.files.remove(key).is_some();
        if removed {
            debug!(kind = self.kind, file = %key, "dropped per-file resolutions");
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        debug!(
            kind = self.kind,
            files = self.files.len(),
            "clearing resolution cache"
        );
        self.files.clear();
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.files.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn stats(&self) -> ResolutionCacheStats {
        self.stats
    }
}
