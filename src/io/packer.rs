//! Packer interface: the seam between the dependency engine and whatever
//! actually packs JavaScript into a single artifact.
//!
//! The orchestrator only needs four capabilities from a packer: declare a
//! list of module names as external (supplied by the vendor bundle), add or
//! require entries with an exposed name, ignore a file, and produce a bundle
//! buffer from the current configuration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::errors::{MundlerError, Result};

/// The bundling collaborator's interface boundary.
#[async_trait]
pub trait Packer: Send {
    /// Mark module names as external: excluded from this bundle, expected to
    /// come from the companion vendor bundle.
    fn external(&mut self, modules: &[String]);

    /// Add a project file under an exposed name.
    fn add(&mut self, file: &Path, expose: &str);

    /// Require a module by bare name (vendor bundles).
    fn require_module(&mut self, module: &str);

    /// Require a file by path with an exposed name (aliases, `useRequire`).
    fn require_path(&mut self, file: &Path, expose: &str);

    /// Exclude a file from the bundle.
    fn ignore(&mut self, file: &Path);

    /// Produce a bundle buffer from the current configuration.
    async fn bundle(&mut self) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
enum Entry {
    File { path: PathBuf, expose: String },
    Module { name: String },
}

/// The built-in packer: concatenates entry sources in insertion order with
/// banner comments, and emits declaration stubs for bare module entries.
///
/// Deliberately not a module system: no wrapping format, no resolution of
/// bare names against installed packages. Swap in a real packer behind the
/// [`Packer`] trait for production artifacts.
#[derive(Debug, Default)]
pub struct ConcatPacker {
    entries: Vec<Entry>,
    externals: Vec<String>,
    ignored: Vec<PathBuf>,
}

impl ConcatPacker {
    /// Create an empty packer.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Packer for ConcatPacker {
    fn external(&mut self, modules: &[String]) {
        self.externals.extend(modules.iter().cloned());
    }

    fn add(&mut self, file: &Path, expose: &str) {
        self.entries.push(Entry::File {
            path: file.to_path_buf(),
            expose: expose.to_string(),
        });
    }

    fn require_module(&mut self, module: &str) {
        self.entries.push(Entry::Module {
            name: module.to_string(),
        });
    }

    fn require_path(&mut self, file: &Path, expose: &str) {
        self.add(file, expose);
    }

    fn ignore(&mut self, file: &Path) {
        self.ignored.push(file.to_path_buf());
    }

    async fn bundle(&mut self) -> Result<Vec<u8>> {
        let mut out = String::new();

        if !self.externals.is_empty() {
            out.push_str(&format!("// externals: {}\n", self.externals.join(", ")));
        }

        for entry in &self.entries {
            match entry {
                Entry::Module { name } => {
                    out.push_str(&format!("// module '{name}' supplied by vendor resolution\n"));
                }
                Entry::File { path, expose } => {
                    if self.ignored.iter().any(|ignored| ignored == path) {
                        continue;
                    }
                    let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                        MundlerError::io(
                            format!("Failed to read bundle entry {}", path.display()),
                            e,
                        )
                    })?;
                    out.push_str(&format!("// --- {expose} ---\n"));
                    out.push_str(&source);
                    if !source.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
        }

        Ok(out.into_bytes())
    }
}
