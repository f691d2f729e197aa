//! Command execution logic.

use mundler::{Mundler, MundlerConfig, ProjectManifest, Result};

use super::args::Cli;

/// Load configuration and manifest, apply CLI overrides, and run the
/// orchestrator.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = MundlerConfig::from_yaml_file(&cli.config)?;
    config.apply_watch_selection(&cli.watch_selection());

    let manifest = ProjectManifest::load_or_default(&cli.manifest);

    let mundler = Mundler::new(config, manifest);
    mundler.run().await
}
