//! Route listing command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use swooce_core::SiteIndex;
use swooce_pages::standard_site;

use crate::config::Project;

/// One line of the route listing.
#[derive(Debug, Serialize)]
pub struct RouteRow {
    pub route: String,
    pub producer: String,
    pub mime_type: Option<String>,
    /// Source file relative to the project root
    pub source: Option<PathBuf>,
}

/// Run the routes command.
pub async fn run(config: &Path, json: bool) -> Result<()> {
    let project = Project::load(config)?;
    let ctx = project.context();
    let index = SiteIndex::build(&ctx, &standard_site(&ctx)).await?;

    let rows = rows(&index, project.root());

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render_table(&rows));
        tracing::info!("{} routes", rows.len());
    }

    Ok(())
}

fn rows(index: &SiteIndex, root: &Path) -> Vec<RouteRow> {
    index
        .entries()
        .map(|entry| RouteRow {
            route: entry.artifact.route().to_string(),
            producer: entry.producer.name().to_string(),
            mime_type: entry.artifact.mime_type().map(str::to_string),
            source: entry
                .artifact
                .source()
                .map(|source| source.strip_prefix(root).unwrap_or(source).to_path_buf()),
        })
        .collect()
}

fn render_table(rows: &[RouteRow]) -> String {
    let route_width = rows.iter().map(|r| r.route.len()).max().unwrap_or(0);
    let producer_width = rows.iter().map(|r| r.producer.len()).max().unwrap_or(0);

    rows.iter()
        .map(|row| {
            let source = row
                .source
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{:route_width$}  {:producer_width$}  {}\n",
                row.route, row.producer, source
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use swooce_core::{BuildContext, ContextConfig};
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_routes_with_relative_sources() {
        let temp = tempdir().unwrap();
        let ctx = BuildContext::new(temp.path(), &ContextConfig::default());
        fs::create_dir_all(ctx.pages_dir()).unwrap();
        fs::write(ctx.pages_dir().join("about.html"), "<p>About</p>").unwrap();
        fs::create_dir_all(&ctx.static_dirs()[0]).unwrap();
        fs::write(ctx.static_dirs()[0].join("app.css"), "body {}").unwrap();

        let index = SiteIndex::build(&ctx, &standard_site(&ctx)).await.unwrap();
        let rows = rows(&index, temp.path());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].route, "/about.html.html");
        assert_eq!(rows[0].producer, "pages");
        assert_eq!(rows[0].source, Some(PathBuf::from("src/pages/about.html")));
        assert_eq!(rows[1].route, "/app.css");
        assert_eq!(rows[1].mime_type.as_deref(), Some("text/css"));

        let table = render_table(&rows);
        assert_eq!(
            table,
            "/about.html.html  pages   src/pages/about.html\n/app.css          static  src/static/app.css\n"
        );
    }
}
