//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use swooce_pages::standard_site;
use swooce_static::StaticBuilder;

use crate::config::Project;

/// Run the build command.
pub async fn run(config: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut project = Project::load(config)?;
    if let Some(output) = output {
        project.config.site.target_dir = output;
    }

    tracing::info!("Building site in {}...", project.root().display());

    let ctx = project.context();
    let site = standard_site(&ctx);
    let result = StaticBuilder::new(ctx, site).build().await?;

    tracing::info!(
        "Built {} artifacts in {}ms",
        result.artifacts,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.target_dir.display());

    Ok(())
}
