//! Preview server command.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::Project;

/// Run the serve command.
pub async fn run(config: &Path, port: u16, dir: Option<PathBuf>) -> Result<()> {
    let project = Project::load(config)?;
    let dir = match dir {
        Some(dir) => dir,
        None => project.context().target_dir().to_path_buf(),
    };

    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'swooce build' first.",
            dir.display()
        );
    }

    let addr: SocketAddr = format!("{}:{}", project.config.dev.host, port)
        .parse()
        .context("Invalid address")?;

    tracing::info!("Serving {} at http://{}", dir.display(), addr);

    let app = Router::new().fallback_service(ServeDir::new(&dir));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    if project.config.dev.open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app).await?;

    Ok(())
}
