//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Project;

const SCAFFOLD: &[(&str, &str)] = &[
    ("src/pages/index.html", DEFAULT_INDEX),
    ("src/pages/blog.toml", DEFAULT_BLOG),
    ("src/pages/post/hello.md", DEFAULT_POST),
    ("src/static/robots.txt", DEFAULT_ROBOTS),
];

/// Run the init command.
pub async fn run(config: &Path, yes: bool) -> Result<()> {
    let project = Project::load(config)?;
    tracing::info!("Initializing swooce in {}...", project.root().display());

    scaffold(&project.manifest, project.root(), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'swooce dev' to start the development server.");

    Ok(())
}

/// Write the default manifest and pages. Existing files are kept unless
/// `overwrite` is set.
fn scaffold(manifest: &Path, root: &Path, overwrite: bool) -> Result<()> {
    write_file(manifest, DEFAULT_CONFIG, overwrite)?;

    for (relative, content) in SCAFFOLD {
        write_file(&root.join(relative), content, overwrite)?;
    }

    Ok(())
}

fn write_file(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            path.display()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# swooce configuration

[site]
# Sources, relative to this file
source_dir = "src"

# Build output, relative to this file
target_dir = "dist"

# Page modules, relative to source_dir
pages_dir = "pages"

# Copied verbatim, relative to source_dir
static_dirs = ["static", "public"]

[build]
# Two artifacts with the same route: "fail", "first-wins" or "last-wins"
collisions = "fail"

# A page module that fails to load: "abort" or "skip"
plugin_failures = "abort"

[dev]
port = 3000
host = "127.0.0.1"
open = true
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Home</title>
  </head>
  <body>
    <h1>Welcome</h1>
    <p>Edit <code>src/pages/index.html</code> and save to reload.</p>
    <p>Read the <a href="/blog.toml.html">blog</a>.</p>
  </body>
</html>
"#;

const DEFAULT_BLOG: &str = r#"title = "Blog"
pattern = "post/*.md"
intro = "Every post under src/pages/post shows up here."
"#;

const DEFAULT_POST: &str = r#"Hello!

This post is plain text. It is shown exactly as written.
"#;

const DEFAULT_ROBOTS: &str = "User-agent: *\nAllow: /\n";
