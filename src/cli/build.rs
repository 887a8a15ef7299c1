//! `dudu build`: one production pass into the output directory.

use anyhow::{Context, Result};

use crate::{
    config::SiteConfig,
    core::BuildMode,
    generator::{BuildReport, Generator},
    log,
};

/// Build the site into `build.output`.
///
/// Items whose output is newer than the source are skipped unless
/// `--force` was given.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let generator = Generator::from_config(config)?;
    let output = &config.build.output;

    let report = generator
        .generate(output, BuildMode::PRODUCTION, config.build.force)
        .with_context(|| format!("Failed to build into `{}`", output.display()))?;

    log!("build"; "{}", report.summary());
    Ok(report)
}
