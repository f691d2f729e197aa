//! # Mundler: Configuration-Driven Bundling Orchestrator
//!
//! Mundler maps named "bundles" (glob-based source sets) to output artifacts,
//! resolves each bundle's external (third-party) dependencies by statically
//! scanning source text, builds a main application bundle and a companion
//! vendor bundle per named bundle, and supports an incremental watch mode
//! that re-resolves dependencies and rebundles when source files change.
//!
//! The interesting part is the dependency-discovery and incremental-rebuild
//! engine: recursive static analysis of import/require references, a
//! per-bundle scan cache that bounds work over cyclic reference graphs, and
//! a diffing protocol that skips vendor rebuilds unless an external module
//! was truly added to or removed from the bundle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mundler::{Mundler, MundlerConfig, ProjectManifest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MundlerConfig::from_yaml_file("mundler.yml")?;
//!     let manifest = ProjectManifest::load_or_default("package.json");
//!
//!     let mundler = Mundler::new(config, manifest);
//!     mundler.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(unsafe_code)]

// Dependency-discovery and incremental-rebuild engine
pub mod core {
    //! Core scanning, resolution, and diffing algorithms.

    pub mod bundler;
    pub mod config;
    pub mod diff;
    pub mod errors;
    pub mod file_utils;
    pub mod ledger;
    pub mod resolver;
    pub mod scanner;
}

// Thin I/O collaborators: packing, watching, task hooks
pub mod io {
    //! Packer interface, file watching, and task-hook execution.

    pub mod packer;
    pub mod tasks;
    pub mod watcher;
}

// Re-export primary types for convenience
pub use crate::core::bundler::Mundler;
pub use crate::core::config::{BundleConfig, MundlerConfig, ProjectManifest, WatchSelection};
pub use crate::core::diff::{ChangeDiffEngine, ChangeOutcome};
pub use crate::core::errors::{MundlerError, Result};
pub use crate::core::ledger::ModuleUsageLedger;
pub use crate::core::resolver::{BundleContext, DependencyResolver};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
