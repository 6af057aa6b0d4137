//! Error taxonomy for the artifact pipeline.
//!
//! Every error here is fatal to the build that raised it. The only tolerated
//! failure is a missing target directory during cleanup, which never surfaces.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifact::{Artifact, Route};

/// Boxed error used at the seams where user code plugs in.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A source location that no routing convention covers.
#[derive(Debug, thiserror::Error)]
#[error("No route convention covers {}", location.display())]
pub struct RouteResolutionError {
    /// The offending source location
    pub location: PathBuf,
}

impl RouteResolutionError {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Errors raised while loading a resolver module or running the resolver it exports.
#[derive(Debug, thiserror::Error)]
pub enum ResolverLoadError {
    #[error("Module {} does not export a resolver", module.display())]
    MissingExport { module: PathBuf },

    #[error("Failed to load module {}: {source}", module.display())]
    Load {
        module: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Resolver exported by {} failed: {source}", module.display())]
    Resolve {
        module: PathBuf,
        #[source]
        source: Box<BuildError>,
    },
}

impl ResolverLoadError {
    /// Location of the module that failed.
    pub fn module(&self) -> &Path {
        match self {
            Self::MissingExport { module }
            | Self::Load { module, .. }
            | Self::Resolve { module, .. } => module,
        }
    }
}

/// The step of the fetch → transform → write sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitPhase {
    Fetch,
    Transform,
    Write,
}

impl fmt::Display for EmitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Fetch => "fetch",
            Self::Transform => "transform",
            Self::Write => "write",
        };
        f.write_str(phase)
    }
}

/// Failure to emit one artifact, tagged with its route, its source file and
/// the failing phase.
#[derive(Debug, thiserror::Error)]
#[error("Failed to {phase} {route}{}: {source}", from_location(.source_location))]
pub struct EmitError {
    pub route: Route,
    pub source_location: Option<PathBuf>,
    pub phase: EmitPhase,
    #[source]
    pub source: BoxError,
}

impl EmitError {
    pub fn new(artifact: &Artifact, phase: EmitPhase, source: impl Into<BoxError>) -> Self {
        Self {
            route: artifact.route().clone(),
            source_location: artifact.source().map(Path::to_path_buf),
            phase,
            source: source.into(),
        }
    }
}

fn from_location(location: &Option<PathBuf>) -> String {
    location
        .as_ref()
        .map(|path| format!(" (from {})", path.display()))
        .unwrap_or_default()
}

/// Two artifacts resolved to the same route.
#[derive(Debug, thiserror::Error)]
#[error("Route {route} is produced by both {first} and {second}")]
pub struct RouteCollisionError {
    pub route: Route,
    /// Description of the artifact that claimed the route first
    pub first: String,
    /// Description of the artifact that collided with it
    pub second: String,
}

/// Errors that can abort a build or an index rebuild.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Route(#[from] RouteResolutionError),

    #[error(transparent)]
    ResolverLoad(#[from] ResolverLoadError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Collision(#[from] RouteCollisionError),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glob pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("Invalid route {0:?}: routes start with '/' and stay inside the site")]
    InvalidRoute(String),

    #[error("Refusing to clean {}: it contains the project sources", .0.display())]
    UnsafeTarget(PathBuf),

    #[error("Resolver failed: {0}")]
    Resolve(String),
}

impl BuildError {
    /// Wrap an I/O error with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
