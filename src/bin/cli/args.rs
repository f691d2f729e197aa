//! CLI Argument Structures

use clap::Parser;
use std::path::PathBuf;

use mundler::WatchSelection;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration-driven bundling with incremental watch mode
#[derive(Parser)]
#[command(name = "mundler")]
#[command(version = VERSION)]
#[command(about = "Mundler - configuration-driven bundling orchestrator")]
#[command(long_about = "
Build a main application bundle and a companion vendor bundle for every
bundle named in the configuration file, resolving external dependencies by
statically scanning require/import references.

Common Usage:

  # Build every configured bundle once
  mundler

  # Use an explicit config file
  mundler --config ./config/mundler.yml

  # Watch every bundle, rebundling incrementally on change
  mundler --watch

  # Watch only selected bundles
  mundler --watch app admin
")]
pub struct Cli {
    /// Path to the mundler configuration file
    #[arg(short, long, default_value = "mundler.yml")]
    pub config: PathBuf,

    /// Path to the project manifest holding alias/shim tables
    #[arg(long, default_value = "package.json")]
    pub manifest: PathBuf,

    /// Watch bundles for changes: no value (or "all") watches every bundle,
    /// otherwise pass one or more bundle names
    #[arg(short, long, num_args = 0.., value_name = "BUNDLE")]
    pub watch: Option<Vec<String>>,

    /// Enable verbose logging for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Translate the `--watch` flag into a watch selection: absent means no
    /// override, empty or containing the `all` sentinel means every bundle,
    /// otherwise the named bundles.
    pub fn watch_selection(&self) -> WatchSelection {
        match &self.watch {
            None => WatchSelection::None,
            Some(names) if names.is_empty() || names.iter().any(|n| n == "all") => {
                WatchSelection::All
            }
            Some(names) => WatchSelection::Bundles(names.clone()),
        }
    }
}
