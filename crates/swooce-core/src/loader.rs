//! Module loading for dynamic-glob resolvers.
//!
//! A module is a file that owns its own resolution logic. Loaders turn the
//! file into a [`ModuleExport`]; the [`ModuleRegistry`] does so through
//! factories registered up front, keyed by exact path or by extension.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::BoxError;
use crate::resolver::ArtifactResolver;

/// What a loaded module exposes.
#[derive(Clone)]
pub enum ModuleExport {
    /// A ready resolver instance
    Resolver(Arc<dyn ArtifactResolver>),

    /// A zero-argument constructor producing a resolver
    Constructor(Arc<dyn Fn() -> Arc<dyn ArtifactResolver> + Send + Sync>),
}

impl ModuleExport {
    pub fn resolver(resolver: impl ArtifactResolver + 'static) -> Self {
        Self::Resolver(Arc::new(resolver))
    }

    pub fn constructor<F, R>(constructor: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: ArtifactResolver + 'static,
    {
        Self::Constructor(Arc::new(move || -> Arc<dyn ArtifactResolver> {
            Arc::new(constructor())
        }))
    }

    /// Obtain the resolver, constructing it if needed.
    pub fn into_resolver(self) -> Arc<dyn ArtifactResolver> {
        match self {
            Self::Resolver(resolver) => resolver,
            Self::Constructor(constructor) => constructor(),
        }
    }
}

impl fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolver(_) => f.write_str("ModuleExport::Resolver"),
            Self::Constructor(_) => f.write_str("ModuleExport::Constructor"),
        }
    }
}

/// Loads module files found by a dynamic-glob resolver.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load `module`, found under `base`.
    ///
    /// `Ok(None)` means the module loaded but exports no resolver.
    async fn load(
        &self,
        ctx: &BuildContext,
        base: &Path,
        module: &Path,
    ) -> Result<Option<ModuleExport>, BoxError>;
}

/// Builds the export of one module file.
pub type ModuleFactory =
    dyn Fn(&BuildContext, &Path) -> Result<ModuleExport, BoxError> + Send + Sync;

/// A registry of module factories.
///
/// Lookup tries the module's base-relative path (`/`-separated) first, then
/// its lowercase file extension.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<ModuleFactory>>,
    extensions: HashMap<String, Arc<ModuleFactory>>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for one module, by its path relative to the search base.
    pub fn register<F>(&mut self, module: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&BuildContext, &Path) -> Result<ModuleExport, BoxError> + Send + Sync + 'static,
    {
        self.modules.insert(module.into(), Arc::new(factory));
        self
    }

    /// Register the factory for every module with the given extension.
    pub fn register_extension<F>(&mut self, extension: &str, factory: F) -> &mut Self
    where
        F: Fn(&BuildContext, &Path) -> Result<ModuleExport, BoxError> + Send + Sync + 'static,
    {
        self.extensions
            .insert(extension.to_lowercase(), Arc::new(factory));
        self
    }

    /// Check if a module path has its own factory.
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    fn lookup(&self, base: &Path, module: &Path) -> Option<&Arc<ModuleFactory>> {
        let by_path = module
            .strip_prefix(base)
            .ok()
            .and_then(relative_key)
            .and_then(|key| self.modules.get(&key));

        by_path.or_else(|| {
            let extension = module.extension()?.to_str()?.to_lowercase();
            self.extensions.get(&extension)
        })
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(
        &self,
        ctx: &BuildContext,
        base: &Path,
        module: &Path,
    ) -> Result<Option<ModuleExport>, BoxError> {
        match self.lookup(base, module) {
            Some(factory) => factory(ctx, module).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&String> = self.modules.keys().collect();
        modules.sort_unstable();
        f.debug_struct("ModuleRegistry")
            .field("modules", &modules)
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn relative_key(relative: &Path) -> Option<String> {
    let segments: Option<Vec<&str>> = relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    segments.map(|s| s.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::artifact::{Artifact, Route};
    use crate::context::ContextConfig;
    use crate::error::BuildError;

    fn ctx() -> BuildContext {
        BuildContext::new("/site", &ContextConfig::default())
    }

    fn fixed(route: &'static str) -> ModuleExport {
        ModuleExport::resolver(move |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
            Ok(vec![Artifact::new(Route::new(route)?)])
        })
    }

    async fn resolve(export: ModuleExport) -> Vec<String> {
        export
            .into_resolver()
            .resolve(&ctx())
            .await
            .unwrap()
            .iter()
            .map(|a| a.route().to_string())
            .collect()
    }

    #[tokio::test]
    async fn exact_path_wins_over_extension() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("posts/special.md", |_: &BuildContext, _: &Path| Ok(fixed("/special.html")))
            .register_extension("MD", |_: &BuildContext, _: &Path| Ok(fixed("/generic.html")));

        let base = Path::new("/site/src/pages");
        let special = registry
            .load(&ctx(), base, &base.join("posts/special.md"))
            .await
            .unwrap()
            .unwrap();
        let other = registry
            .load(&ctx(), base, &base.join("posts/other.md"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolve(special).await, vec!["/special.html"]);
        assert_eq!(resolve(other).await, vec!["/generic.html"]);
    }

    #[tokio::test]
    async fn unknown_module_has_no_export() {
        let registry = ModuleRegistry::new();
        let base = Path::new("/site/src/pages");

        let export = registry
            .load(&ctx(), base, &base.join("index.ts"))
            .await
            .unwrap();

        assert!(export.is_none());
    }

    #[tokio::test]
    async fn constructor_exports_build_a_resolver() {
        let export = ModuleExport::constructor(|| {
            |_: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
                Ok(vec![Artifact::new(Route::new("/made.html")?)])
            }
        });

        assert!(matches!(export, ModuleExport::Constructor(_)));
        assert_eq!(resolve(export).await, vec!["/made.html"]);
    }

    #[tokio::test]
    async fn factory_errors_surface() {
        let mut registry = ModuleRegistry::new();
        registry.register_extension("ts", |_: &BuildContext, _: &Path| {
            Err("unexpected token".into())
        });

        let base = Path::new("/site/src/pages");
        let err = registry
            .load(&ctx(), base, &base.join("index.ts"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "unexpected token");
    }

    #[test]
    fn lists_extensions_sorted() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_extension("toml", |_: &BuildContext, _: &Path| Ok(fixed("/a.html")))
            .register_extension("html", |_: &BuildContext, _: &Path| Ok(fixed("/b.html")));

        assert_eq!(registry.extensions(), vec!["html", "toml"]);
        assert!(!registry.contains("index.html"));
    }
}
