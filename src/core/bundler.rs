//! The bundling orchestrator.
//!
//! Drives the full per-bundle flow: verify required properties, expand the
//! source glob, resolve the external-module list, build the vendor bundle,
//! build the main bundle, and run pre/post task hooks. In watch mode each
//! bundle gets a long-running session that diffs changed files against the
//! ledger and regenerates the vendor bundle only on true additions or
//! removals.
//!
//! Bundles are fully isolated: one bundle's configuration error or build
//! failure is logged and never aborts sibling bundles. A watch session
//! survives task-hook failures and unreadable edits; the dominant use case
//! is a long-running process where a single bad save must not kill the
//! whole session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::future;
use indexmap::IndexSet;
use tracing::{debug, error, info, warn};

use crate::core::config::{BundleConfig, MundlerConfig, ProjectManifest};
use crate::core::diff::ChangeDiffEngine;
use crate::core::errors::{MundlerError, Result};
use crate::core::resolver::{BundleContext, DependencyResolver};
use crate::io::packer::{ConcatPacker, Packer};
use crate::io::tasks::run_tasks;
use crate::io::watcher::BundleWatcher;

/// The bundling orchestrator: configuration plus project manifest.
pub struct Mundler {
    config: MundlerConfig,
    manifest: ProjectManifest,
}

impl Mundler {
    /// Create an orchestrator from loaded configuration and manifest.
    pub fn new(config: MundlerConfig, manifest: ProjectManifest) -> Self {
        Self { config, manifest }
    }

    /// Build every configured bundle, then hold watch sessions open for the
    /// bundles that requested them. Per-bundle failures are logged and do not
    /// affect siblings.
    pub async fn run(&self) -> Result<()> {
        info!("Starting Mundler...");

        let sessions = self
            .config
            .bundles
            .iter()
            .map(|(name, props)| self.run_bundle(name, props));

        for (name, result) in self
            .config
            .bundles
            .keys()
            .zip(future::join_all(sessions).await)
        {
            if let Err(e) = result {
                error!("Skipping bundle '{name}': {e}");
            }
        }

        Ok(())
    }

    /// Build one bundle and, when its watch flag is set, keep watching it.
    ///
    /// A watch-enabled bundle whose initial build fails (a bad task hook, an
    /// unreadable entry) still gets its watch session: the failure is logged
    /// and the next change event retries the build.
    async fn run_bundle(&self, name: &str, props: &BundleConfig) -> Result<()> {
        let (_, dest) = props.verify_required(name)?;
        let dest = PathBuf::from(dest);
        let pattern = props.resolved_src(name)?;

        let files = expand_glob(&pattern)?;
        let mut ctx = BundleContext::new(name, props, &self.manifest);

        let modules = DependencyResolver::resolve(&mut ctx, files).await?;
        info!(
            "Bundle '{name}': {} external module(s) resolved",
            modules.len()
        );

        let vendor_buf = match self.build_artifacts(name, props, &dest, &modules).await {
            Ok(buf) => buf,
            Err(e) if props.watch => {
                warn!("Initial build of '{name}' failed: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        if props.watch {
            self.watch_bundle(name, props, ctx, vendor_buf, &dest).await
        } else {
            Ok(())
        }
    }

    /// One full packing pass: vendor bundle then main bundle. Returns the
    /// cached vendor buffer when `concat` is set.
    async fn build_artifacts(
        &self,
        name: &str,
        props: &BundleConfig,
        dest: &Path,
        modules: &[String],
    ) -> Result<Option<Vec<u8>>> {
        let vendor_buf = self.build_vendor_bundle(name, props, dest, modules).await?;
        self.build_main_bundle(name, props, dest, modules, vendor_buf.as_deref())
            .await?;
        Ok(vendor_buf)
    }

    /// Build the companion vendor bundle for `name`.
    ///
    /// Returns the vendor buffer instead of writing it when `concat` is set,
    /// so the main build can prepend it. When the bundle uses no external
    /// modules and no aliases there is nothing to vendor and no artifact is
    /// produced.
    async fn build_vendor_bundle(
        &self,
        name: &str,
        props: &BundleConfig,
        dest: &Path,
        modules: &[String],
    ) -> Result<Option<Vec<u8>>> {
        let vendor_name = format!("vendor-{name}");

        if modules.is_empty() && self.manifest.aliases.is_empty() {
            info!("Bundle '{vendor_name}': nothing to vendor, skipping");
            return Ok(None);
        }

        let start = Instant::now();
        let mut packer = ConcatPacker::new();

        for module in modules {
            packer.require_module(module);
        }
        for (alias, target) in &self.manifest.aliases {
            packer.require_path(&resolve_against_cwd(target), alias);
        }

        // Task hooks belong to the main bundle; the vendor pass never runs them.
        let buf = packer
            .bundle()
            .await
            .map_err(|e| MundlerError::bundle(vendor_name.as_str(), e.to_string()))?;

        if props.concat {
            info!(
                "Bundle '{vendor_name}': created in {:.3} seconds and cached for concatenation",
                start.elapsed().as_secs_f64()
            );
            return Ok(Some(buf));
        }

        let vendor_dest = vendor_dest_path(props, dest, &vendor_name);
        write_artifact(&vendor_dest, &buf).await?;
        info!(
            "Bundle '{vendor_name}': written in {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(None)
    }

    /// Build and write the main bundle artifact.
    async fn build_main_bundle(
        &self,
        name: &str,
        props: &BundleConfig,
        dest: &Path,
        modules: &[String],
        vendor_buf: Option<&[u8]>,
    ) -> Result<()> {
        let start = Instant::now();
        let pattern = props.resolved_src(name)?;
        let base = props.base_path();

        let mut packer = ConcatPacker::new();
        packer.external(modules);
        if !self.manifest.aliases.is_empty() {
            let aliases: Vec<String> = self.manifest.aliases.keys().cloned().collect();
            packer.external(&aliases);
        }

        for file in expand_glob(&pattern)? {
            if props.ignore_files.iter().any(|ignored| {
                file.strip_prefix(&base)
                    .unwrap_or(&file)
                    .to_string_lossy()
                    == ignored.as_str()
            }) {
                packer.ignore(&file);
                continue;
            }

            let expose = expose_name(&file, &base, props.prefix.as_deref());
            if props.use_require {
                packer.require_path(&file, &expose);
            } else {
                packer.add(&file, &expose);
            }
        }

        run_tasks(props.pre_tasks.as_ref()).await?;

        let mut buf = packer
            .bundle()
            .await
            .map_err(|e| MundlerError::bundle(name, e.to_string()))?;

        if let Some(vendor) = vendor_buf {
            let mut combined = vendor.to_vec();
            combined.extend_from_slice(&buf);
            buf = combined;
        }

        write_artifact(dest, &buf).await?;
        info!(
            "Bundle '{name}': written in {:.3} seconds",
            start.elapsed().as_secs_f64()
        );

        // Post-task failure is reported but never fails an already-written bundle.
        if let Err(e) = run_tasks(props.post_tasks.as_ref()).await {
            warn!("{e}");
        }

        Ok(())
    }

    /// Long-running watch session for one bundle.
    ///
    /// Change events are processed one batch at a time: events arriving while
    /// a rebuild is in flight queue in the watcher channel and are coalesced
    /// into the next batch, so two diff passes never run over the same ledger
    /// concurrently.
    async fn watch_bundle(
        &self,
        name: &str,
        props: &BundleConfig,
        mut ctx: BundleContext,
        mut vendor_buf: Option<Vec<u8>>,
        dest: &Path,
    ) -> Result<()> {
        let pattern = props.resolved_src(name)?;
        let source_pattern = glob::Pattern::new(&pattern)
            .map_err(|e| MundlerError::glob(pattern.as_str(), e.to_string()))?;
        let root = glob_base(&pattern);
        let mut watcher = BundleWatcher::watch(&[root], &ctx.extensions)?;
        info!("Watching '{name}' for changes...");

        while let Some(changed) = watcher.next_changed().await {
            let mut batch: IndexSet<PathBuf> = IndexSet::new();
            batch.insert(changed);
            while let Some(queued) = watcher.try_next_changed() {
                batch.insert(queued);
            }

            let mut vendor_dirty = false;
            for file in &batch {
                if !watch_relevant(&source_pattern, &ctx.files_cache, file) {
                    debug!("Change to {} is outside the bundle, skipping", file.display());
                    continue;
                }
                let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, file).await;
                if outcome.requires_vendor_rebuild() {
                    info!("Detected {outcome} in '{name}', rebuilding vendor bundle");
                    vendor_dirty = true;
                }
            }

            if vendor_dirty {
                let modules = ctx.ledger.external_modules(&ctx.aliases_and_shims);
                match self.build_vendor_bundle(name, props, dest, &modules).await {
                    Ok(buf) => vendor_buf = buf,
                    Err(e) => warn!("Vendor rebuild for '{name}' failed: {e}"),
                }
            }

            let modules = ctx.ledger.external_modules(&ctx.aliases_and_shims);
            if let Err(e) = self
                .build_main_bundle(name, props, dest, &modules, vendor_buf.as_deref())
                .await
            {
                // Keep the watch session alive through transient failures.
                warn!("Rebuild of '{name}' failed: {e}");
            }
        }

        Ok(())
    }
}

/// Expand a source glob into an ordered list of files.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).map_err(|e| MundlerError::glob(pattern, e.to_string()))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable glob entry: {e}"),
        }
    }
    Ok(files)
}

/// The exposed module name for a project file: its path relative to the
/// bundle base, without the final extension, with the optional prefix
/// prepended (normalized to end in `/`).
pub fn expose_name(file: &Path, base: &Path, prefix: Option<&str>) -> String {
    let relative = file
        .strip_prefix(base)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned();

    let without_extension = match relative.rfind('.') {
        Some(idx) => relative[..idx].to_string(),
        None => relative,
    };

    match prefix {
        Some(prefix) if prefix.ends_with('/') => format!("{prefix}{without_extension}"),
        Some(prefix) => format!("{prefix}/{without_extension}"),
        None => without_extension,
    }
}

/// The vendor artifact's destination: the explicit `vendorDest` override, or
/// `vendor-<name>.js` alongside the main destination.
pub fn vendor_dest_path(props: &BundleConfig, dest: &Path, vendor_name: &str) -> PathBuf {
    match &props.vendor_dest {
        Some(vendor_dest) => PathBuf::from(vendor_dest),
        None => dest
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{vendor_name}.js")),
    }
}

/// Whether a change event belongs to the bundle: the file matches the source
/// pattern, or it was already scanned after being pulled in transitively
/// through an internal reference. The OS watcher reports everything under
/// the watch root; events for unrelated files must not reach the diff engine.
pub fn watch_relevant(
    pattern: &glob::Pattern,
    scanned: &HashSet<PathBuf>,
    file: &Path,
) -> bool {
    pattern.matches_path(file) || scanned.contains(file)
}

/// The static (glob-free) prefix of a source pattern, used as the watch root.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[']) {
            break;
        }
        base.push(component);
    }
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else if base == Path::new(pattern) {
        // A literal file path: watch its directory.
        base.parent().map(Path::to_path_buf).unwrap_or(base)
    } else {
        base
    }
}

/// Resolve a manifest alias target against the process working directory.
fn resolve_against_cwd(target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

/// Write an artifact, creating its parent directories as needed.
async fn write_artifact(dest: &Path, buf: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MundlerError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
    }
    tokio::fs::write(dest, buf)
        .await
        .map_err(|e| MundlerError::io(format!("Failed to write {}", dest.display()), e))
}
