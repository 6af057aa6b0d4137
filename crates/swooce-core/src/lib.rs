//! Artifact resolution and emission pipeline.
//!
//! Resolvers discover [`Artifact`]s, the [`BuildContext`] maps their sources to
//! public routes, and emitters render them either to the target directory or
//! into any async sink. A [`Site`] is the ordered list of resolver/emitter
//! [`Producer`]s, and a [`SiteIndex`] answers route lookups for on-demand serving.

pub mod artifact;
pub mod context;
pub mod emitter;
pub mod error;
pub mod index;
pub mod loader;
pub mod resolver;
pub mod route;
pub mod site;

pub use artifact::{
    Artifact, Content, ContentSource, RenderedDocument, Route, SourceBytes, StaticContent,
};
pub use context::{BuildContext, CollisionPolicy, ContextConfig, PluginFailurePolicy};
pub use emitter::{
    ArtifactEmitter, ContentEmitter, CopyEmitter, Identity, SelectingEmitter, Transform,
};
pub use error::{
    BoxError, BuildError, EmitError, EmitPhase, ResolverLoadError, RouteCollisionError,
    RouteResolutionError,
};
pub use index::{IndexEntry, SiteIndex};
pub use loader::{ModuleExport, ModuleFactory, ModuleLoader, ModuleRegistry};
pub use resolver::{
    scan_glob, ArtifactResolver, DynamicGlobResolver, FactoryGlobResolver, SearchRoot,
};
pub use route::{ConventionRouter, RouteResolver, RouteRule, RouteStyle};
pub use site::{Producer, ResolvedArtifact, Site};
