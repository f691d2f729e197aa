//! Dependency resolution over a bundle's internal reference graph.
//!
//! The resolver reads each source file, strips comments, scans for raw
//! references, and classifies each one: references that do not begin with a
//! relative-path marker (`.`) are external modules; everything else resolves
//! to another project file and is queued for scanning.
//!
//! The original implementation did this through mutually recursive callbacks
//! ("WARNING: RECURSION"); here it is an explicit worklist bounded by the
//! per-bundle files cache, which guarantees termination over cyclic internal
//! reference graphs and makes the cycle property directly testable.
//!
//! Each frontier of files is read concurrently, but results are always joined
//! in input order (`future::join_all`), never completion order, so the
//! first-discovery order of the output list is deterministic across runs.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use futures::future;
use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::core::config::{BundleConfig, ProjectManifest};
use crate::core::errors::Result;
use crate::core::file_utils::FileReader;
use crate::core::ledger::ModuleUsageLedger;
use crate::core::scanner::{scan_references, strip_comments};

/// Per-bundle resolution state. One context per bundle, passed explicitly
/// through every call; bundles never share caches or counters.
#[derive(Debug)]
pub struct BundleContext {
    /// Bundle name, used in log lines and error context.
    pub name: String,
    /// Absolute base path of the bundle's sources.
    pub base_path: PathBuf,
    /// Internal-reference extensions in preference order.
    pub extensions: Vec<String>,
    /// Files (relative to `base_path`) excluded from scanning.
    pub ignore_files: Vec<String>,
    /// Alias and shim names that must never appear in the external list.
    pub aliases_and_shims: IndexSet<String>,
    /// Files already read and scanned in this bundle; prevents duplicate
    /// reads and bounds recursion over reference cycles.
    pub files_cache: HashSet<PathBuf>,
    /// Usage bookkeeping for watch-mode diffing.
    pub ledger: ModuleUsageLedger,
}

impl BundleContext {
    /// Build a context for one bundle from its properties and the project
    /// manifest's alias/shim tables.
    pub fn new(name: impl Into<String>, props: &BundleConfig, manifest: &ProjectManifest) -> Self {
        Self {
            name: name.into(),
            base_path: props.base_path(),
            extensions: props.extensions.clone(),
            ignore_files: props.ignore_files.clone(),
            aliases_and_shims: manifest.alias_and_shim_names(),
            files_cache: HashSet::new(),
            ledger: ModuleUsageLedger::new(),
        }
    }

    /// Whether `file` is on the bundle's ignore list (compared relative to
    /// the bundle base).
    pub fn is_ignored(&self, file: &Path) -> bool {
        let relative = file
            .strip_prefix(&self.base_path)
            .unwrap_or(file)
            .to_string_lossy();
        self.ignore_files.iter().any(|ignored| ignored == relative.as_ref())
    }
}

/// Classification of one raw scanned reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A third-party module to be supplied by the vendor bundle.
    External(String),
    /// A relative reference into the project's own source tree.
    Internal(String),
}

/// Classify a raw reference literal: relative-path markers mean internal.
pub fn classify(raw: &str) -> Reference {
    if raw.starts_with('.') {
        Reference::Internal(raw.to_string())
    } else {
        Reference::External(raw.to_string())
    }
}

/// Resolves a bundle's deduplicated external-module list by scanning its file
/// set and every internal reference reachable from it.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve the external-module list for `files`, recording usage in the
    /// context's ledger as it goes.
    ///
    /// Unreadable files are logged and skipped; their contribution is empty.
    /// Calling twice on an unchanged file set yields the same list in the
    /// same first-discovery order.
    pub async fn resolve(ctx: &mut BundleContext, files: Vec<PathBuf>) -> Result<Vec<String>> {
        let mut modules: IndexSet<String> = IndexSet::new();

        let mut frontier: Vec<PathBuf> = Vec::new();
        for file in files {
            if ctx.is_ignored(&file) {
                debug!("Skipping ignored file: {}", file.display());
                continue;
            }
            if ctx.files_cache.insert(file.clone()) {
                frontier.push(file);
            }
        }

        while !frontier.is_empty() {
            // Fan out the reads; join in input order so discovery order never
            // depends on I/O completion timing.
            let scans = future::join_all(frontier.iter().map(|file| Self::read_and_scan(file)))
                .await;

            let mut next_frontier: Vec<PathBuf> = Vec::new();

            for (file, raw_refs) in frontier.iter().zip(scans) {
                for raw in raw_refs {
                    match classify(&raw) {
                        Reference::External(module) => {
                            ctx.ledger.record(file, &module);
                            // Aliases and shims are tracked in the ledger but
                            // excluded from the effective external set.
                            if !ctx.aliases_and_shims.contains(&module) {
                                modules.insert(module);
                            }
                        }
                        Reference::Internal(reference) => {
                            let resolved = resolve_internal(file, &reference, &ctx.extensions);
                            if ctx.is_ignored(&resolved) {
                                continue;
                            }
                            if ctx.files_cache.insert(resolved.clone()) {
                                next_frontier.push(resolved);
                            }
                        }
                    }
                }
            }

            frontier = next_frontier;
        }

        debug!(
            "Resolved {} external module(s) for bundle '{}'",
            modules.len(),
            ctx.name
        );
        Ok(modules.into_iter().collect())
    }

    /// Read one file and return its raw reference literals in scan order.
    /// Read failures degrade to an empty contribution.
    async fn read_and_scan(file: &Path) -> Vec<String> {
        match FileReader::read_to_string(file).await {
            Ok(text) => {
                let stripped = strip_comments(&text);
                scan_references(&stripped).map(str::to_string).collect()
            }
            Err(e) => {
                warn!("Skipping unreadable file {}: {e}", file.display());
                Vec::new()
            }
        }
    }

    /// Rescan a single file's direct external references, without recursing
    /// into its internal references. Used by the watch-mode diff step.
    pub async fn direct_externals(file: &Path) -> IndexSet<String> {
        Self::read_and_scan(file)
            .await
            .into_iter()
            .filter_map(|raw| match classify(&raw) {
                Reference::External(module) => Some(module),
                Reference::Internal(_) => None,
            })
            .collect()
    }
}

/// Resolve an internal reference to an absolute file path relative to the
/// referencing file's directory, trying the configured extensions in
/// preference order. When no candidate exists on disk the first preference is
/// returned anyway; the subsequent read logs and skips it.
pub fn resolve_internal(from: &Path, reference: &str, extensions: &[String]) -> PathBuf {
    let dir = from.parent().unwrap_or_else(|| Path::new("."));
    let joined = normalize_path(&dir.join(reference));

    let already_has_extension = extensions.iter().any(|ext| {
        joined
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == ext)
    });
    if already_has_extension {
        return joined;
    }

    let mut first_candidate = None;
    for ext in extensions {
        let candidate = PathBuf::from(format!("{}.{ext}", joined.display()));
        if candidate.is_file() {
            return candidate;
        }
        if first_candidate.is_none() {
            first_candidate = Some(candidate);
        }
    }

    first_candidate.unwrap_or(joined)
}

/// Lexically normalize `.` and `..` components so that two references to the
/// same file always hit the same files-cache entry.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BundleConfig;
    use std::fs;
    use tempfile::TempDir;

    fn context_for(dir: &TempDir) -> BundleContext {
        let props = BundleConfig {
            cwd: Some(dir.path().to_path_buf()),
            extensions: vec!["js".to_string(), "jsx".to_string()],
            ..BundleConfig::default()
        };
        BundleContext::new("test", &props, &ProjectManifest::default())
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn classify_relative_markers_as_internal() {
        assert_eq!(
            classify("./lib/util"),
            Reference::Internal("./lib/util".to_string())
        );
        assert_eq!(
            classify("../shared"),
            Reference::Internal("../shared".to_string())
        );
        assert_eq!(classify("chai"), Reference::External("chai".to_string()));
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./../c/d.js")),
            PathBuf::from("/a/c/d.js")
        );
    }

    #[tokio::test]
    async fn resolves_transitive_externals_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "lib/helper.js", "var _ = require('lodash');");
        let main = write(
            &dir,
            "main.js",
            "var chai = require('chai');\nvar helper = require('./lib/helper');\nvar sinon = require('sinon');",
        );

        let mut ctx = context_for(&dir);
        let modules = DependencyResolver::resolve(&mut ctx, vec![main])
            .await
            .unwrap();
        assert_eq!(modules, vec!["chai", "sinon", "lodash"]);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write(&dir, "util.js", "require('fs');");
        let main = write(&dir, "main.js", "require('path');\nrequire('./util');");

        let mut first_ctx = context_for(&dir);
        let first = DependencyResolver::resolve(&mut first_ctx, vec![main.clone()])
            .await
            .unwrap();

        let mut second_ctx = context_for(&dir);
        let second = DependencyResolver::resolve(&mut second_ctx, vec![main])
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["path", "fs"]);
    }

    #[tokio::test]
    async fn terminates_on_reference_cycles() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.js", "require('chai');\nrequire('./b');");
        write(&dir, "b.js", "require('sinon');\nrequire('./a');");

        let mut ctx = context_for(&dir);
        let modules = DependencyResolver::resolve(&mut ctx, vec![a]).await.unwrap();
        assert_eq!(modules, vec!["chai", "sinon"]);
    }

    #[tokio::test]
    async fn unreadable_file_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.js", "require('chai');\nrequire('./missing');");

        let mut ctx = context_for(&dir);
        let modules = DependencyResolver::resolve(&mut ctx, vec![main]).await.unwrap();
        assert_eq!(modules, vec!["chai"]);
    }

    #[tokio::test]
    async fn ignored_files_are_skipped_entirely() {
        let dir = TempDir::new().unwrap();
        let ignored = write(&dir, "skip.js", "require('mocha');");
        let main = write(&dir, "main.js", "require('chai');");

        let mut ctx = context_for(&dir);
        ctx.ignore_files = vec!["skip.js".to_string()];
        let modules = DependencyResolver::resolve(&mut ctx, vec![main, ignored])
            .await
            .unwrap();
        assert_eq!(modules, vec!["chai"]);
    }

    #[tokio::test]
    async fn aliased_modules_stay_out_of_the_external_list() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.js", "require('jquery');\nrequire('chai');");

        let manifest = ProjectManifest::from_json_str(
            r#"{"browser": {"jquery": "./vendor/jquery.js"}}"#,
        )
        .unwrap();
        let props = BundleConfig {
            cwd: Some(dir.path().to_path_buf()),
            extensions: vec!["js".to_string()],
            ..BundleConfig::default()
        };
        let mut ctx = BundleContext::new("test", &props, &manifest);

        let modules = DependencyResolver::resolve(&mut ctx, vec![main.clone()])
            .await
            .unwrap();
        assert_eq!(modules, vec!["chai"]);
        // The ledger still tracks the aliased reference for diffing.
        assert!(ctx.ledger.file_set(&main).unwrap().contains("jquery"));
    }

    #[tokio::test]
    async fn extension_preference_order_is_respected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "comp.jsx", "require('react');");
        let main = write(&dir, "main.js", "require('./comp');");

        let mut ctx = context_for(&dir);
        let modules = DependencyResolver::resolve(&mut ctx, vec![main]).await.unwrap();
        assert_eq!(modules, vec!["react"]);
    }

    #[tokio::test]
    async fn direct_externals_skips_internal_references() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.js", "require('chai');\nrequire('./util');");

        let externals = DependencyResolver::direct_externals(&main).await;
        assert_eq!(
            externals.into_iter().collect::<Vec<_>>(),
            vec!["chai".to_string()]
        );
    }
}
