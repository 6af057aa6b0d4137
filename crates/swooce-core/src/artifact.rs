//! Artifacts: immutable units of output identified by their public route.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::{BoxError, BuildError, RouteResolutionError};

/// Public path of an artifact. Always begins with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route(pub(crate) String);

impl Route {
    /// Validate and wrap a route string.
    ///
    /// Rejects routes that do not start with `/` and routes with `..` segments,
    /// which would escape the target directory.
    pub fn new(route: impl Into<String>) -> Result<Self, BuildError> {
        let route = route.into();
        if !route.starts_with('/') || route.split('/').any(|segment| segment == "..") {
            return Err(BuildError::InvalidRoute(route));
        }
        Ok(Self(route))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of this route under `target_dir`, i.e. `<target_dir><route>`.
    pub fn target_path(&self, target_dir: &Path) -> PathBuf {
        let mut path = target_dir.to_path_buf();
        for segment in self.0.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Route {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A fully built document that only needs serializing, e.g. a parsed HTML tree.
pub trait RenderedDocument: Send + Sync + fmt::Debug {
    /// Serialize the document to its final markup.
    fn serialize(&self) -> String;
}

/// Content fetched for an artifact.
#[derive(Debug)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
    Document(Box<dyn RenderedDocument>),
}

impl Content {
    /// Serialize into the bytes written to the target.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
            Self::Document(doc) => doc.serialize().into_bytes(),
        }
    }

    /// Text view of the content. Documents are serialized, bytes decoded lossily.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Self::Document(doc) => doc.serialize(),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Capability to produce an artifact's source content.
///
/// Implementations must be read-only: callers may fetch any number of times
/// (once per build, again per live request) and nothing is cached.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<Content, BoxError>;
}

/// Fixed content known when the artifact is resolved.
#[derive(Debug, Clone)]
pub struct StaticContent(pub String);

#[async_trait]
impl ContentSource for StaticContent {
    async fn fetch(&self, _ctx: &BuildContext, _artifact: &Artifact) -> Result<Content, BoxError> {
        Ok(Content::Text(self.0.clone()))
    }
}

/// Reads the artifact's own source file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceBytes;

#[async_trait]
impl ContentSource for SourceBytes {
    async fn fetch(&self, _ctx: &BuildContext, artifact: &Artifact) -> Result<Content, BoxError> {
        let source = artifact
            .source()
            .ok_or_else(|| format!("artifact {} has no source file", artifact.route()))?;
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| BuildError::fs(source, e))?;
        Ok(Content::Bytes(bytes))
    }
}

/// One unit of output.
///
/// Created by a resolver and never mutated afterwards; the builder methods
/// consume the value.
#[derive(Clone)]
pub struct Artifact {
    route: Route,
    mime_type: Option<String>,
    source: Option<PathBuf>,
    content: Option<Arc<dyn ContentSource>>,
}

impl Artifact {
    /// Create an artifact with only a route.
    pub fn new(route: Route) -> Self {
        Self {
            route,
            mime_type: None,
            source: None,
            content: None,
        }
    }

    /// Create an artifact for a source file, routed by the context.
    ///
    /// The MIME type is guessed from the route's extension.
    pub fn from_source(
        ctx: &BuildContext,
        source: impl Into<PathBuf>,
    ) -> Result<Self, RouteResolutionError> {
        let source = source.into();
        let route = ctx.resolve_route(&source)?;
        let mime_type = guess_mime_type(route.as_str());

        Ok(Self {
            route,
            mime_type,
            source: Some(source),
            content: None,
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_content(mut self, content: impl ContentSource + 'static) -> Self {
        self.content = Some(Arc::new(content));
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Fetch this artifact's content through its content source.
    pub async fn fetch_content(&self, ctx: &BuildContext) -> Result<Content, BoxError> {
        match &self.content {
            Some(content) => content.fetch(ctx, self).await,
            None => Err(format!("artifact {} has no content source", self.route).into()),
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("route", &self.route)
            .field("mime_type", &self.mime_type)
            .field("source", &self.source)
            .field("has_content", &self.content.is_some())
            .finish()
    }
}

fn guess_mime_type(path: &str) -> Option<String> {
    mime_guess::from_path(path).first().map(|mime| mime.to_string())
}
