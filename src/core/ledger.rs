//! Per-bundle bookkeeping of external-module usage.
//!
//! The ledger tracks, for every scanned file, the ordered set of external
//! modules that file references directly, plus a global reference count per
//! module across all files in the bundle. The count invariant: a module's
//! count always equals the number of files whose per-file set contains it,
//! and never drops below zero. Count reaching zero means the module is no
//! longer used anywhere in the bundle and must leave the vendor set.
//!
//! Attribution rule: externals are attributed to the leaf file whose text
//! contains the reference, never rolled up to the top-level file that pulled
//! the leaf in through an internal reference chain.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};

/// The zero-crossings produced by replacing one file's reference set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerDelta {
    /// Modules whose global count transitioned 0 -> 1 (true additions).
    pub newly_used: Vec<String>,
    /// Modules whose global count transitioned to 0 (true removals).
    pub dropped: Vec<String>,
}

impl LedgerDelta {
    /// True when no zero-crossing occurred in either direction.
    pub fn is_noop(&self) -> bool {
        self.newly_used.is_empty() && self.dropped.is_empty()
    }
}

/// Per-bundle ledger of which files reference which external modules.
#[derive(Debug, Default, Clone)]
pub struct ModuleUsageLedger {
    /// File path -> ordered set of external module names referenced directly.
    file_modules: IndexMap<PathBuf, IndexSet<String>>,
    /// External module name -> number of files currently referencing it.
    counts: IndexMap<String, usize>,
}

impl ModuleUsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `file` references `module`. Returns `true` when the module
    /// was not already in the file's set (and the global count was bumped).
    pub fn record(&mut self, file: &Path, module: &str) -> bool {
        let entry = self.file_modules.entry(file.to_path_buf()).or_default();
        if entry.insert(module.to_string()) {
            *self.counts.entry(module.to_string()).or_insert(0) += 1;
            true
        } else {
            false
        }
    }

    /// The ordered direct-external set recorded for `file`, if any.
    pub fn file_set(&self, file: &Path) -> Option<&IndexSet<String>> {
        self.file_modules.get(file)
    }

    /// Current global reference count for `module`.
    pub fn count(&self, module: &str) -> usize {
        self.counts.get(module).copied().unwrap_or(0)
    }

    /// Replace `file`'s direct-external set with `new_set`, adjusting global
    /// counts for the symmetric difference and reporting zero-crossings.
    ///
    /// Counts are recomputed from the full new set rather than applied as a
    /// blind delta, so a rebuild that failed mid-way naturally reconciles on
    /// the next change event.
    pub fn replace_file_set(&mut self, file: &Path, new_set: IndexSet<String>) -> LedgerDelta {
        let old_set = self
            .file_modules
            .get(file)
            .cloned()
            .unwrap_or_default();

        let mut delta = LedgerDelta::default();

        for module in new_set.iter() {
            if !old_set.contains(module) {
                let count = self.counts.entry(module.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    delta.newly_used.push(module.clone());
                }
            }
        }

        for module in old_set.iter() {
            if !new_set.contains(module) {
                let count = self.counts.entry(module.clone()).or_insert(0);
                // Clamp at zero; drift below would break the invariant.
                *count = count.saturating_sub(1);
                if *count == 0 {
                    delta.dropped.push(module.clone());
                }
            }
        }

        self.file_modules.insert(file.to_path_buf(), new_set);
        delta
    }

    /// The deduplicated, order-preserving projection of modules with a
    /// positive count, excluding declared aliases and shims. This is the
    /// bundle's effective external/vendor set.
    pub fn external_modules(&self, exclude: &IndexSet<String>) -> Vec<String> {
        self.counts
            .iter()
            .filter(|(module, count)| **count > 0 && !exclude.contains(*module))
            .map(|(module, _)| module.clone())
            .collect()
    }

    /// All files currently tracked by the ledger.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.file_modules.keys().map(PathBuf::as_path)
    }

    /// Verify the count invariant; used by tests.
    #[cfg(test)]
    pub fn invariant_holds(&self) -> bool {
        let mut expected: IndexMap<&str, usize> = IndexMap::new();
        for set in self.file_modules.values() {
            for module in set {
                *expected.entry(module.as_str()).or_insert(0) += 1;
            }
        }
        self.counts
            .iter()
            .all(|(module, count)| expected.get(module.as_str()).copied().unwrap_or(0) == *count)
    }
}
