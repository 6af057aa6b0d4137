//! Project configuration (swooce.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use swooce_core::{BuildContext, CollisionPolicy, ContextConfig, PluginFailurePolicy};
use swooce_server::DevServerConfig;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub dev: DevSection,
}

#[derive(Debug, Deserialize)]
pub struct SiteSection {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,
    #[serde(default = "default_static_dirs")]
    pub static_dirs: Vec<PathBuf>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            target_dir: default_target_dir(),
            pages_dir: default_pages_dir(),
            static_dirs: default_static_dirs(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct BuildSection {
    #[serde(default)]
    pub collisions: CollisionPolicy,
    #[serde(default)]
    pub plugin_failures: PluginFailurePolicy,
}

#[derive(Debug, Deserialize)]
pub struct DevSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_true")]
    pub open: bool,
    #[serde(default = "default_true")]
    pub live_reload: bool,
}

impl Default for DevSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            open: true,
            live_reload: true,
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}
fn default_target_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_pages_dir() -> PathBuf {
    PathBuf::from("pages")
}
fn default_static_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("static"), PathBuf::from("public")]
}
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_true() -> bool {
    true
}

impl ConfigFile {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            source_dir: self.site.source_dir.clone(),
            target_dir: self.site.target_dir.clone(),
            pages_dir: self.site.pages_dir.clone(),
            static_dirs: self.site.static_dirs.clone(),
            collisions: self.build.collisions,
            plugin_failures: self.build.plugin_failures,
        }
    }

    pub fn dev_server_config(&self) -> DevServerConfig {
        DevServerConfig {
            host: self.dev.host.clone(),
            port: self.dev.port,
            open: self.dev.open,
            live_reload: self.dev.live_reload,
        }
    }
}

/// A loaded project: the manifest location and its configuration.
#[derive(Debug)]
pub struct Project {
    pub manifest: PathBuf,
    pub config: ConfigFile,
}

impl Project {
    /// Load the manifest at `path`.
    ///
    /// A missing manifest yields the default configuration, rooted at the
    /// directory it would live in. A malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let manifest = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;

        let config = if manifest.exists() {
            let content = fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read {}", manifest.display()))?;
            let config = ConfigFile::parse(&content)
                .with_context(|| format!("Failed to parse {}", manifest.display()))?;
            tracing::info!("Loaded config from {}", manifest.display());
            config
        } else {
            tracing::debug!("No {} found, using defaults", manifest.display());
            ConfigFile::default()
        };

        Ok(Self { manifest, config })
    }

    pub fn root(&self) -> &Path {
        self.manifest.parent().unwrap_or(Path::new("."))
    }

    pub fn context(&self) -> BuildContext {
        BuildContext::from_manifest(&self.manifest, &self.config.context_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConfigFile::parse("").unwrap();

        assert_eq!(config.site.source_dir, PathBuf::from("src"));
        assert_eq!(config.site.target_dir, PathBuf::from("dist"));
        assert_eq!(config.site.static_dirs.len(), 2);
        assert_eq!(config.build.collisions, CollisionPolicy::Fail);
        assert_eq!(config.dev.port, 3000);
        assert!(config.dev.open);
    }

    #[test]
    fn parses_every_section() {
        let config = ConfigFile::parse(
            r#"
[site]
target_dir = "target"
static_dirs = ["assets"]

[build]
collisions = "last-wins"
plugin_failures = "skip"

[dev]
port = 8080
open = false
"#,
        )
        .unwrap();

        assert_eq!(config.site.target_dir, PathBuf::from("target"));
        assert_eq!(config.site.pages_dir, PathBuf::from("pages"));
        assert_eq!(config.site.static_dirs, vec![PathBuf::from("assets")]);
        assert_eq!(config.build.collisions, CollisionPolicy::LastWins);
        assert_eq!(config.build.plugin_failures, PluginFailurePolicy::Skip);
        assert_eq!(config.dev.port, 8080);
        assert!(!config.dev.open);
        assert!(config.dev.live_reload);
    }

    #[test]
    fn rejects_unknown_policies() {
        assert!(ConfigFile::parse("[build]\ncollisions = \"sometimes\"\n").is_err());
    }

    #[test]
    fn project_root_is_manifest_directory() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("swooce.toml");
        fs::write(&manifest, "[site]\ntarget_dir = \"out\"\n").unwrap();

        let project = Project::load(&manifest).unwrap();
        let ctx = project.context();

        assert_eq!(project.root(), temp.path());
        assert_eq!(ctx.target_dir(), temp.path().join("out"));
        assert_eq!(ctx.pages_dir(), temp.path().join("src/pages"));
    }

    #[test]
    fn missing_manifest_uses_defaults() {
        let temp = tempdir().unwrap();

        let project = Project::load(&temp.path().join("swooce.toml")).unwrap();

        assert_eq!(project.context().target_dir(), temp.path().join("dist"));
    }
}
