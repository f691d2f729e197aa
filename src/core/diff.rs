//! Watch-mode incremental diffing of a changed file's external references.
//!
//! On each file-change notification, exactly the changed file is rescanned;
//! only its direct external references are recomputed (no recursion into
//! internal references, keeping watch latency bounded). The fresh set is
//! diffed against the ledger's prior set for the file, and the tri-state
//! outcome gates whether the vendor bundle is regenerated before the main
//! bundle rebuild.

use std::path::Path;

use tracing::debug;

use crate::core::resolver::{BundleContext, DependencyResolver};

/// Outcome of diffing one changed file against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The effective external-module set did not change; the vendor bundle
    /// can be left alone.
    None,
    /// These modules crossed 0 -> 1 and must be added to the vendor bundle.
    Added(Vec<String>),
    /// These modules dropped to 0 and must leave the vendor bundle.
    Removed(Vec<String>),
}

impl ChangeOutcome {
    /// Whether the vendor bundle needs to be regenerated.
    pub fn requires_vendor_rebuild(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "no effective change"),
            Self::Added(modules) => write!(f, "addition of '{}'", modules.join("', '")),
            Self::Removed(modules) => write!(f, "removal of '{}'", modules.join("', '")),
        }
    }
}

/// Computes whether a file change altered the bundle's effective external set.
pub struct ChangeDiffEngine;

impl ChangeDiffEngine {
    /// Rescan `file` and fold its new direct-external set into the bundle's
    /// ledger. The per-file set is updated regardless of whether any global
    /// count crossed zero. Files on the bundle's ignore list are never
    /// rescanned; their edits cannot touch the ledger.
    ///
    /// An edit that both adds and removes zero-crossing modules in one event
    /// reports `Added`; the vendor rebuild recomputes the full projection
    /// from the ledger, so the removal is honored there as well.
    pub async fn on_file_changed(ctx: &mut BundleContext, file: &Path) -> ChangeOutcome {
        if ctx.is_ignored(file) {
            debug!("Ignoring change to excluded file {}", file.display());
            return ChangeOutcome::None;
        }

        let new_set = DependencyResolver::direct_externals(file).await;
        debug!(
            "Rescanned {}: {} direct external(s)",
            file.display(),
            new_set.len()
        );

        let delta = ctx.ledger.replace_file_set(file, new_set);

        if !delta.newly_used.is_empty() {
            ChangeOutcome::Added(delta.newly_used)
        } else if !delta.dropped.is_empty() {
            ChangeOutcome::Removed(delta.dropped)
        } else {
            ChangeOutcome::None
        }
    }
}
