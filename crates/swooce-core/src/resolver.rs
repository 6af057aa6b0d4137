//! Artifact resolvers: strategies that discover artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::artifact::Artifact;
use crate::context::{BuildContext, PluginFailurePolicy};
use crate::error::{BuildError, ResolverLoadError};
use crate::loader::ModuleLoader;

/// Produces zero or more artifacts for a build.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError>;
}

#[async_trait]
impl<F> ArtifactResolver for F
where
    F: Fn(&BuildContext) -> Result<Vec<Artifact>, BuildError> + Send + Sync,
{
    async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
        self(ctx)
    }
}

/// Directory a glob resolver searches from.
#[derive(Debug, Clone)]
pub enum SearchRoot {
    /// A fixed location
    Path(PathBuf),

    /// Relative to the project directory
    Project(PathBuf),

    /// Relative to the source directory
    Source(PathBuf),
}

impl SearchRoot {
    pub fn locate(&self, ctx: &BuildContext) -> PathBuf {
        match self {
            Self::Path(path) => path.clone(),
            Self::Project(relative) => ctx.project_dir().join(relative),
            Self::Source(relative) => ctx.source_dir().join(relative),
        }
    }
}

impl From<PathBuf> for SearchRoot {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for SearchRoot {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Find files under `base` whose base-relative path matches `pattern`.
///
/// Directories are never returned. `*` does not cross `/` and does not match
/// a leading dot; `**` spans directories. Results are absolute (when `base`
/// is) and in walk order, sorted by file name within each directory. A
/// missing `base` yields no matches.
pub async fn scan_glob(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, BuildError> {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let matcher = Pattern::new(pattern).map_err(|e| BuildError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let base = base.to_path_buf();

    tokio::task::spawn_blocking(move || scan_blocking(&base, &matcher))
        .await
        .map_err(|e| BuildError::Resolve(format!("glob scan task failed: {}", e)))?
}

fn scan_blocking(base: &Path, matcher: &Pattern) -> Result<Vec<PathBuf>, BuildError> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut matches = Vec::new();

    for entry in WalkDir::new(base).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(base).to_path_buf();
            BuildError::fs(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(base) else {
            continue;
        };

        if matcher.matches_path_with(relative, options) {
            matches.push(entry.path().to_path_buf());
        }
    }

    Ok(matches)
}

/// Builds one artifact from a matched file.
pub type ArtifactFactory =
    dyn Fn(&BuildContext, &Path) -> Result<Artifact, BuildError> + Send + Sync;

/// Matches files by pattern and builds one artifact per match.
#[derive(Clone)]
pub struct FactoryGlobResolver {
    root: SearchRoot,
    pattern: String,
    factory: Arc<ArtifactFactory>,
}

impl FactoryGlobResolver {
    pub fn new<F>(root: impl Into<SearchRoot>, pattern: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BuildContext, &Path) -> Result<Artifact, BuildError> + Send + Sync + 'static,
    {
        Self {
            root: root.into(),
            pattern: pattern.into(),
            factory: Arc::new(factory),
        }
    }

    /// Resolver whose artifacts are plain source files routed by the context.
    pub fn source_files(root: impl Into<SearchRoot>, pattern: impl Into<String>) -> Self {
        Self::new(root, pattern, |ctx, path| Ok(Artifact::from_source(ctx, path)?))
    }
}

#[async_trait]
impl ArtifactResolver for FactoryGlobResolver {
    async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
        let base = self.root.locate(ctx);
        let matches = scan_glob(&base, &self.pattern).await?;

        tracing::debug!(
            "{} files match {} under {}",
            matches.len(),
            self.pattern,
            base.display()
        );

        matches
            .iter()
            .map(|path| (self.factory)(ctx, path.as_path()))
            .collect()
    }
}

/// Matches module files by pattern, loads each through a [`ModuleLoader`] and
/// flattens the artifacts their exported resolvers produce.
#[derive(Clone)]
pub struct DynamicGlobResolver {
    root: SearchRoot,
    pattern: String,
    loader: Arc<dyn ModuleLoader>,
}

impl DynamicGlobResolver {
    pub fn new(
        root: impl Into<SearchRoot>,
        pattern: impl Into<String>,
        loader: impl ModuleLoader + 'static,
    ) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
            loader: Arc::new(loader),
        }
    }

    async fn resolve_module(
        &self,
        ctx: &BuildContext,
        base: &Path,
        module: &Path,
    ) -> Result<Vec<Artifact>, ResolverLoadError> {
        let export = self
            .loader
            .load(ctx, base, module)
            .await
            .map_err(|source| ResolverLoadError::Load {
                module: module.to_path_buf(),
                source,
            })?
            .ok_or_else(|| ResolverLoadError::MissingExport {
                module: module.to_path_buf(),
            })?;

        export
            .into_resolver()
            .resolve(ctx)
            .await
            .map_err(|e| ResolverLoadError::Resolve {
                module: module.to_path_buf(),
                source: Box::new(e),
            })
    }
}

#[async_trait]
impl ArtifactResolver for DynamicGlobResolver {
    async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
        let base = self.root.locate(ctx);
        let modules = scan_glob(&base, &self.pattern).await?;
        let mut artifacts = Vec::new();

        for module in modules {
            match self.resolve_module(ctx, &base, &module).await {
                Ok(found) => {
                    tracing::debug!(
                        "Module {} resolved {} artifacts",
                        module.display(),
                        found.len()
                    );
                    artifacts.extend(found);
                }
                // Unroutable sources are configuration errors under any policy
                Err(ResolverLoadError::Resolve { source, .. })
                    if matches!(*source, BuildError::Route(_)) =>
                {
                    return Err(*source);
                }
                Err(e) => match ctx.plugin_failure_policy() {
                    PluginFailurePolicy::Abort => return Err(e.into()),
                    PluginFailurePolicy::Skip => {
                        tracing::warn!("Skipping module {}: {}", module.display(), e);
                    }
                },
            }
        }

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::artifact::{Route, StaticContent};
    use crate::context::ContextConfig;
    use crate::loader::{ModuleExport, ModuleRegistry};

    fn site() -> (tempfile::TempDir, BuildContext) {
        let temp = tempdir().unwrap();
        let ctx = BuildContext::new(temp.path(), &ContextConfig::default());
        (temp, ctx)
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn routes(artifacts: &[Artifact]) -> Vec<String> {
        let mut routes: Vec<String> = artifacts
            .iter()
            .map(|a| a.route().to_string())
            .collect();
        routes.sort();
        routes
    }

    #[tokio::test]
    async fn factory_resolver_builds_one_artifact_per_match() {
        let (_temp, ctx) = site();
        let posts = ctx.pages_dir().join("posts");
        write(&posts.join("a.md"), "a");
        write(&posts.join("b.md"), "b");
        write(&posts.join("c.txt"), "c");

        let resolver = FactoryGlobResolver::source_files(posts.clone(), "*.md");
        let artifacts = resolver.resolve(&ctx).await.unwrap();

        assert_eq!(
            routes(&artifacts),
            vec!["/posts/a.md.html", "/posts/b.md.html"]
        );
    }

    #[tokio::test]
    async fn factory_resolver_empty_dir_is_not_an_error() {
        let (_temp, ctx) = site();
        let empty = ctx.source_dir().join("empty");
        fs::create_dir_all(&empty).unwrap();

        let resolver = FactoryGlobResolver::source_files(empty, "*.md");

        assert!(resolver.resolve(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn glob_skips_directories_and_dotfiles() {
        let (_temp, ctx) = site();
        let static_dir = &ctx.static_dirs()[0];
        write(&static_dir.join("img/logo.png"), "png");
        write(&static_dir.join(".DS_Store"), "junk");
        fs::create_dir_all(static_dir.join("empty-dir")).unwrap();

        let matches = scan_glob(static_dir, "**/*").await.unwrap();

        assert_eq!(matches, vec![static_dir.join("img/logo.png")]);
    }

    #[tokio::test]
    async fn glob_rejects_bad_patterns() {
        let (_temp, ctx) = site();

        let err = scan_glob(ctx.source_dir(), "[").await.unwrap_err();

        assert!(matches!(err, BuildError::Pattern { .. }));
    }

    #[tokio::test]
    async fn factory_route_errors_propagate() {
        let (temp, ctx) = site();
        write(&temp.path().join("notes/todo.md"), "todo");

        let resolver =
            FactoryGlobResolver::source_files(SearchRoot::Project("notes".into()), "*.md");
        let err = resolver.resolve(&ctx).await.unwrap_err();

        assert!(matches!(err, BuildError::Route(_)));
    }

    #[tokio::test]
    async fn dynamic_resolver_flattens_module_results() {
        let (_temp, ctx) = site();
        write(&ctx.pages_dir().join("index.ts"), "");
        write(&ctx.pages_dir().join("blog.ts"), "");

        let mut registry = ModuleRegistry::new();
        registry.register("index.ts", |ctx: &BuildContext, module: &Path| {
            let artifact = Artifact::from_source(ctx, module)?
                .with_content(StaticContent("<h1>Index</h1>".to_string()));
            Ok(ModuleExport::resolver(
                move |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                    Ok(vec![artifact.clone()])
                },
            ))
        });
        registry.register("blog.ts", |_: &BuildContext, _: &Path| {
            Ok(ModuleExport::constructor(|| {
                |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                    Ok(vec![
                        Artifact::new(Route::new("/blog/one.html")?),
                        Artifact::new(Route::new("/blog/two.html")?),
                    ])
                }
            }))
        });

        let resolver =
            DynamicGlobResolver::new(SearchRoot::Source("pages".into()), "**/*.ts", registry);
        let artifacts = resolver.resolve(&ctx).await.unwrap();

        assert_eq!(
            routes(&artifacts),
            vec!["/blog/one.html", "/blog/two.html", "/index.ts.html"]
        );
    }

    #[tokio::test]
    async fn missing_export_is_a_load_error() {
        let (_temp, ctx) = site();
        write(&ctx.pages_dir().join("orphan.ts"), "");

        let resolver =
            DynamicGlobResolver::new(ctx.pages_dir(), "*.ts", ModuleRegistry::new());
        let err = resolver.resolve(&ctx).await.unwrap_err();

        match err {
            BuildError::ResolverLoad(ResolverLoadError::MissingExport { module }) => {
                assert_eq!(module, ctx.pages_dir().join("orphan.ts"));
            }
            other => panic!("expected missing export, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn skip_policy_isolates_failing_modules() {
        let (_temp, ctx) = site();
        let ctx = ctx.with_plugin_failure_policy(PluginFailurePolicy::Skip);
        write(&ctx.pages_dir().join("broken.ts"), "");
        write(&ctx.pages_dir().join("good.ts"), "");

        let mut registry = ModuleRegistry::new();
        registry.register("broken.ts", |_: &BuildContext, _: &Path| {
            Err("syntax error".into())
        });
        registry.register("good.ts", |ctx: &BuildContext, module: &Path| {
            let artifact = Artifact::from_source(ctx, module)?;
            Ok(ModuleExport::resolver(
                move |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                    Ok(vec![artifact.clone()])
                },
            ))
        });

        let resolver = DynamicGlobResolver::new(ctx.pages_dir(), "*.ts", registry);
        let artifacts = resolver.resolve(&ctx).await.unwrap();

        assert_eq!(routes(&artifacts), vec!["/good.ts.html"]);
    }

    #[tokio::test]
    async fn abort_policy_wraps_nested_failures() {
        let (_temp, ctx) = site();
        write(&ctx.pages_dir().join("fails.ts"), "");

        let mut registry = ModuleRegistry::new();
        registry.register("fails.ts", |_: &BuildContext, _: &Path| {
            Ok(ModuleExport::resolver(
                |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                    Err(BuildError::Resolve("upstream unavailable".to_string()))
                },
            ))
        });

        let resolver = DynamicGlobResolver::new(ctx.pages_dir(), "*.ts", registry);
        let err = resolver.resolve(&ctx).await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::ResolverLoad(ResolverLoadError::Resolve { .. })
        ));
        assert!(err.to_string().contains("fails.ts"));
    }

    #[tokio::test]
    async fn route_errors_escape_skip_policy() {
        let (temp, ctx) = site();
        let ctx = ctx.with_plugin_failure_policy(PluginFailurePolicy::Skip);
        write(&ctx.pages_dir().join("stray.ts"), "");
        let stray = temp.path().join("outside.md");

        let mut registry = ModuleRegistry::new();
        registry.register("stray.ts", move |_: &BuildContext, _: &Path| {
            let stray = stray.clone();
            Ok(ModuleExport::resolver(
                move |ctx: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                    Ok(vec![Artifact::from_source(ctx, stray.clone())?])
                },
            ))
        });

        let resolver = DynamicGlobResolver::new(ctx.pages_dir(), "*.ts", registry);
        let err = resolver.resolve(&ctx).await.unwrap_err();

        assert!(matches!(err, BuildError::Route(_)));
    }
}
