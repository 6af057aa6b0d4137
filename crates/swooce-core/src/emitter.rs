//! Emitters: render an artifact and deliver it to a file or a stream.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::artifact::{Artifact, Content};
use crate::context::BuildContext;
use crate::error::{BoxError, BuildError, EmitError, EmitPhase};

/// Terminal step for an artifact.
///
/// `write` streams the rendered artifact into any sink (an HTTP response in
/// serve mode); `emit` writes it to the artifact's target location. Both run
/// the same rendering logic.
#[async_trait]
pub trait ArtifactEmitter: Send + Sync {
    /// Render the artifact into `sink`.
    async fn write(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), EmitError>;

    /// Render the artifact to `<target_dir><route>`, replacing any existing file.
    async fn emit(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<(), EmitError> {
        let target = ctx.target_location(artifact);
        ensure_parent(artifact, &target).await?;

        let mut file = fs::File::create(&target)
            .await
            .map_err(|e| write_error(artifact, &target, e))?;
        self.write(ctx, artifact, &mut file).await?;
        file.flush()
            .await
            .map_err(|e| write_error(artifact, &target, e))?;

        Ok(())
    }
}

/// Copies the artifact's source file byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyEmitter;

impl CopyEmitter {
    fn source<'a>(artifact: &'a Artifact) -> Result<&'a Path, EmitError> {
        artifact.source().ok_or_else(|| {
            EmitError::new(
                artifact,
                EmitPhase::Fetch,
                "artifact has no source file to copy",
            )
        })
    }
}

#[async_trait]
impl ArtifactEmitter for CopyEmitter {
    async fn write(
        &self,
        _ctx: &BuildContext,
        artifact: &Artifact,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), EmitError> {
        let source = Self::source(artifact)?;
        let mut file = fs::File::open(source).await.map_err(|e| {
            EmitError::new(artifact, EmitPhase::Fetch, BuildError::fs(source, e))
        })?;

        tokio::io::copy(&mut file, sink)
            .await
            .map_err(|e| EmitError::new(artifact, EmitPhase::Write, e))?;
        Ok(())
    }

    async fn emit(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<(), EmitError> {
        let source = Self::source(artifact)?;
        let target = ctx.target_location(artifact);
        ensure_parent(artifact, &target).await?;

        fs::copy(source, &target)
            .await
            .map_err(|e| write_error(artifact, &target, e))?;
        Ok(())
    }
}

/// Transform step of the content emitter.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
        content: Content,
    ) -> Result<Content, BoxError>;
}

#[async_trait]
impl<F> Transform for F
where
    F: Fn(&BuildContext, &Artifact, Content) -> Result<Content, BoxError> + Send + Sync,
{
    async fn transform(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
        content: Content,
    ) -> Result<Content, BoxError> {
        self(ctx, artifact, content)
    }
}

/// Passes content through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl Transform for Identity {
    async fn transform(
        &self,
        _ctx: &BuildContext,
        _artifact: &Artifact,
        content: Content,
    ) -> Result<Content, BoxError> {
        Ok(content)
    }
}

/// Runs fetch → transform → write for artifacts with a content source.
#[derive(Clone)]
pub struct ContentEmitter {
    transform: Arc<dyn Transform>,
}

impl ContentEmitter {
    /// Content emitter with the identity transform.
    pub fn new() -> Self {
        Self {
            transform: Arc::new(Identity),
        }
    }

    pub fn with_transform(transform: impl Transform + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
        }
    }

    /// Fetch and transform the artifact's content, serialized to bytes.
    pub async fn render(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
    ) -> Result<Vec<u8>, EmitError> {
        let content = artifact
            .fetch_content(ctx)
            .await
            .map_err(|e| EmitError::new(artifact, EmitPhase::Fetch, e))?;

        let transformed = self
            .transform
            .transform(ctx, artifact, content)
            .await
            .map_err(|e| EmitError::new(artifact, EmitPhase::Transform, e))?;

        Ok(transformed.into_bytes())
    }
}

impl Default for ContentEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEmitter").finish_non_exhaustive()
    }
}

#[async_trait]
impl ArtifactEmitter for ContentEmitter {
    async fn write(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), EmitError> {
        let bytes = self.render(ctx, artifact).await?;

        sink.write_all(&bytes)
            .await
            .map_err(|e| EmitError::new(artifact, EmitPhase::Write, e))?;
        sink.flush()
            .await
            .map_err(|e| EmitError::new(artifact, EmitPhase::Write, e))?;
        Ok(())
    }

    async fn emit(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<(), EmitError> {
        let bytes = self.render(ctx, artifact).await?;
        let target = ctx.target_location(artifact);
        ensure_parent(artifact, &target).await?;

        fs::write(&target, bytes)
            .await
            .map_err(|e| write_error(artifact, &target, e))?;
        Ok(())
    }
}

type EmitterSelector =
    dyn Fn(&BuildContext, &Artifact) -> Arc<dyn ArtifactEmitter> + Send + Sync;

/// Chooses an emitter per artifact, e.g. content emission for pages and
/// copying for everything else.
#[derive(Clone)]
pub struct SelectingEmitter {
    select: Arc<EmitterSelector>,
}

impl SelectingEmitter {
    pub fn new<F>(select: F) -> Self
    where
        F: Fn(&BuildContext, &Artifact) -> Arc<dyn ArtifactEmitter> + Send + Sync + 'static,
    {
        Self {
            select: Arc::new(select),
        }
    }
}

#[async_trait]
impl ArtifactEmitter for SelectingEmitter {
    async fn write(
        &self,
        ctx: &BuildContext,
        artifact: &Artifact,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), EmitError> {
        (self.select)(ctx, artifact).write(ctx, artifact, sink).await
    }

    async fn emit(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<(), EmitError> {
        (self.select)(ctx, artifact).emit(ctx, artifact).await
    }
}

async fn ensure_parent(artifact: &Artifact, target: &Path) -> Result<(), EmitError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(artifact, parent, e))?;
    }
    Ok(())
}

fn write_error(artifact: &Artifact, path: &Path, error: std::io::Error) -> EmitError {
    EmitError::new(artifact, EmitPhase::Write, BuildError::fs(path, error))
}
