//! Development server command.

use std::path::Path;

use anyhow::Result;
use swooce_pages::standard_site;
use swooce_server::DevServer;

use crate::config::Project;

/// Run the dev server.
pub async fn run(config: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let project = Project::load(config)?;

    let mut server_config = project.config.dev_server_config();
    if let Some(port) = port {
        server_config.port = port;
    }
    server_config.open = server_config.open && open;

    tracing::info!("Starting development server on port {}", server_config.port);

    let ctx = project.context();
    let site = standard_site(&ctx);
    DevServer::new(ctx, site, server_config).start().await?;

    Ok(())
}
