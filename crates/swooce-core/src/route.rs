//! Route resolution: mapping source locations to public routes.

use std::path::{Component, Path, PathBuf};

use crate::artifact::Route;
use crate::error::RouteResolutionError;

/// Maps a source location to the public route it is served at.
///
/// Must be pure, and total over every location the configured resolvers can
/// produce. An unsupported location is a configuration error.
pub trait RouteResolver: Send + Sync {
    fn resolve_route(&self, location: &Path) -> Result<Route, RouteResolutionError>;
}

impl<F> RouteResolver for F
where
    F: Fn(&Path) -> Result<Route, RouteResolutionError> + Send + Sync,
{
    fn resolve_route(&self, location: &Path) -> Result<Route, RouteResolutionError> {
        self(location)
    }
}

/// How paths under a rule's root become routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStyle {
    /// Relative path with `.html` appended. The source extension is kept,
    /// so `post-1.md` routes to `/post-1.md.html`.
    Page,

    /// Relative path unchanged.
    Verbatim,
}

/// A source sub-tree and the routing style applied beneath it.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub root: PathBuf,
    pub style: RouteStyle,
}

/// Directory-convention router. The first rule whose root contains the
/// location wins.
#[derive(Debug, Clone, Default)]
pub struct ConventionRouter {
    rules: Vec<RouteRule>,
}

impl ConventionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route files under `root` as pages.
    pub fn pages(mut self, root: impl Into<PathBuf>) -> Self {
        self.rules.push(RouteRule {
            root: root.into(),
            style: RouteStyle::Page,
        });
        self
    }

    /// Route files under `root` verbatim.
    pub fn verbatim(mut self, root: impl Into<PathBuf>) -> Self {
        self.rules.push(RouteRule {
            root: root.into(),
            style: RouteStyle::Verbatim,
        });
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl RouteResolver for ConventionRouter {
    fn resolve_route(&self, location: &Path) -> Result<Route, RouteResolutionError> {
        for rule in &self.rules {
            let Ok(relative) = location.strip_prefix(&rule.root) else {
                continue;
            };
            let Some(relative) = posix_relative(relative) else {
                continue;
            };

            let route = match rule.style {
                RouteStyle::Page => format!("/{}.html", relative),
                RouteStyle::Verbatim => format!("/{}", relative),
            };
            return Ok(Route(route));
        }

        Err(RouteResolutionError::new(location))
    }
}

/// Join the normal components of a relative path with `/`.
///
/// Returns `None` for empty paths, paths that climb with `..`, and
/// non UTF-8 names.
fn posix_relative(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
