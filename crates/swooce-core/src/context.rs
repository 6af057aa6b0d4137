//! Build-scoped configuration shared by every resolver and emitter.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::artifact::{Artifact, Route};
use crate::error::RouteResolutionError;
use crate::route::{ConventionRouter, RouteResolver};

/// What happens when two artifacts resolve to the same route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Abort with a `RouteCollisionError`
    #[default]
    Fail,

    /// Keep the artifact resolved first
    FirstWins,

    /// Keep the artifact resolved last
    LastWins,
}

/// What happens when a dynamically loaded resolver module fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginFailurePolicy {
    /// Abort the resolve phase
    #[default]
    Abort,

    /// Log a warning and drop only that module's artifacts
    Skip,
}

/// Layout and policies used to construct a [`BuildContext`].
///
/// Directory fields are relative: `source_dir` and `target_dir` to the
/// project root, `pages_dir` and `static_dirs` to the source directory.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub static_dirs: Vec<PathBuf>,
    pub collisions: CollisionPolicy,
    pub plugin_failures: PluginFailurePolicy,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            target_dir: PathBuf::from("dist"),
            pages_dir: PathBuf::from("pages"),
            static_dirs: vec![PathBuf::from("static"), PathBuf::from("public")],
            collisions: CollisionPolicy::default(),
            plugin_failures: PluginFailurePolicy::default(),
        }
    }
}

/// Immutable per-build configuration, passed by reference to every step.
#[derive(Clone)]
pub struct BuildContext {
    project_dir: PathBuf,
    source_dir: PathBuf,
    target_dir: PathBuf,
    pages_dir: PathBuf,
    static_dirs: Vec<PathBuf>,
    router: Arc<dyn RouteResolver>,
    collisions: CollisionPolicy,
    plugin_failures: PluginFailurePolicy,
}

impl BuildContext {
    /// Create a context rooted at `project_dir`, which should be absolute.
    ///
    /// The default router routes the pages directory as pages and every
    /// static directory verbatim.
    pub fn new(project_dir: impl Into<PathBuf>, config: &ContextConfig) -> Self {
        let project_dir = project_dir.into();
        let source_dir = project_dir.join(&config.source_dir);
        let target_dir = project_dir.join(&config.target_dir);
        let pages_dir = source_dir.join(&config.pages_dir);
        let static_dirs: Vec<PathBuf> = config
            .static_dirs
            .iter()
            .map(|dir| source_dir.join(dir))
            .collect();

        let router = static_dirs
            .iter()
            .fold(ConventionRouter::new().pages(&pages_dir), |router, dir| {
                router.verbatim(dir)
            });

        Self {
            project_dir,
            source_dir,
            target_dir,
            pages_dir,
            static_dirs,
            router: Arc::new(router),
            collisions: config.collisions,
            plugin_failures: config.plugin_failures,
        }
    }

    /// Create a context rooted at the directory containing a project manifest.
    pub fn from_manifest(manifest: &Path, config: &ContextConfig) -> Self {
        let project_dir = manifest.parent().unwrap_or(Path::new("."));
        Self::new(project_dir, config)
    }

    /// Replace the route resolver.
    pub fn with_router(mut self, router: impl RouteResolver + 'static) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collisions = policy;
        self
    }

    pub fn with_plugin_failure_policy(mut self, policy: PluginFailurePolicy) -> Self {
        self.plugin_failures = policy;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    pub fn static_dirs(&self) -> &[PathBuf] {
        &self.static_dirs
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collisions
    }

    pub fn plugin_failure_policy(&self) -> PluginFailurePolicy {
        self.plugin_failures
    }

    /// Route a source location.
    pub fn resolve_route(&self, location: &Path) -> Result<Route, RouteResolutionError> {
        self.router.resolve_route(location)
    }

    /// Where an artifact is written: `<target_dir><route>`.
    pub fn target_location(&self, artifact: &Artifact) -> PathBuf {
        artifact.route().target_path(&self.target_dir)
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project_dir", &self.project_dir)
            .field("source_dir", &self.source_dir)
            .field("target_dir", &self.target_dir)
            .field("pages_dir", &self.pages_dir)
            .field("static_dirs", &self.static_dirs)
            .field("collisions", &self.collisions)
            .field("plugin_failures", &self.plugin_failures)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_directories_from_project_root() {
        let ctx = BuildContext::new("/site", &ContextConfig::default());

        assert_eq!(ctx.source_dir(), Path::new("/site/src"));
        assert_eq!(ctx.target_dir(), Path::new("/site/dist"));
        assert_eq!(ctx.pages_dir(), Path::new("/site/src/pages"));
        assert_eq!(
            ctx.static_dirs(),
            &[
                PathBuf::from("/site/src/static"),
                PathBuf::from("/site/src/public")
            ]
        );
    }

    #[test]
    fn manifest_parent_is_project_root() {
        let config = ContextConfig {
            target_dir: PathBuf::from("target"),
            ..Default::default()
        };
        let ctx = BuildContext::from_manifest(Path::new("/site/swooce.toml"), &config);

        assert_eq!(ctx.project_dir(), Path::new("/site"));
        assert_eq!(ctx.target_dir(), Path::new("/site/target"));
    }

    #[test]
    fn default_router_covers_public_dir() {
        let ctx = BuildContext::new("/site", &ContextConfig::default());

        let route = ctx
            .resolve_route(Path::new("/site/src/public/robots.txt"))
            .unwrap();

        assert_eq!(route.as_str(), "/robots.txt");
    }

    #[test]
    fn target_location_follows_route() {
        let ctx = BuildContext::new("/site", &ContextConfig::default());
        let artifact = Artifact::new(Route::new("/blog/index.html").unwrap());

        assert_eq!(
            ctx.target_location(&artifact),
            PathBuf::from("/site/dist/blog/index.html")
        );
    }

    #[test]
    fn router_can_be_replaced() {
        let ctx = BuildContext::new("/site", &ContextConfig::default())
            .with_router(ConventionRouter::new().verbatim("/elsewhere"));

        assert!(ctx
            .resolve_route(Path::new("/site/src/pages/index.ts"))
            .is_err());
        assert_eq!(
            ctx.resolve_route(Path::new("/elsewhere/a.txt"))
                .unwrap()
                .as_str(),
            "/a.txt"
        );
    }
}
