//! One-shot build pipeline.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

use tokio::fs;

use swooce_core::{BuildContext, BuildError, ResolvedArtifact, Site};

/// Phase of a build run.
///
/// `Idle → CleaningTarget → Resolving → Emitting → Done`, with `Failed`
/// reachable from any working phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    CleaningTarget,
    Resolving,
    Emitting,
    Done,
    Failed,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CleaningTarget => "cleaning target",
            Self::Resolving => "resolving",
            Self::Emitting => "emitting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of artifacts emitted
    pub artifacts: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Target directory
    pub target_dir: PathBuf,

    /// Phases the run went through, ending in `Done`
    pub states: Vec<BuildState>,
}

/// Tracks the phase of a single run.
struct Run {
    states: Vec<BuildState>,
}

impl Run {
    fn new() -> Self {
        Self {
            states: vec![BuildState::Idle],
        }
    }

    fn state(&self) -> BuildState {
        self.states.last().copied().unwrap_or(BuildState::Idle)
    }

    fn advance(&mut self, next: BuildState) {
        tracing::debug!("Build {} -> {}", self.state(), next);
        self.states.push(next);
    }

    fn fail(&mut self, error: BuildError) -> BuildError {
        tracing::error!("Build failed while {}: {}", self.state(), error);
        self.states.push(BuildState::Failed);
        error
    }
}

/// Builds a site into the context's target directory.
pub struct StaticBuilder {
    ctx: BuildContext,
    site: Site,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(ctx: BuildContext, site: Site) -> Self {
        Self { ctx, site }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Build the site.
    ///
    /// Every call is an independent run: the target directory is removed and
    /// recreated, then artifacts are resolved and emitted in order. The first
    /// error aborts the run and leaves the target directory partially filled.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut run = Run::new();

        run.advance(BuildState::CleaningTarget);
        self.clean_target().await.map_err(|e| run.fail(e))?;

        run.advance(BuildState::Resolving);
        let resolved = self.site.resolve(&self.ctx).await.map_err(|e| run.fail(e))?;
        tracing::info!("Resolved {} artifacts", resolved.len());

        run.advance(BuildState::Emitting);
        self.emit_all(&resolved).await.map_err(|e| run.fail(e))?;

        run.advance(BuildState::Done);
        let duration = start.elapsed();

        Ok(BuildResult {
            artifacts: resolved.len(),
            duration_ms: duration.as_millis() as u64,
            target_dir: self.ctx.target_dir().to_path_buf(),
            states: run.states,
        })
    }

    /// Remove and recreate the target directory.
    async fn clean_target(&self) -> Result<(), BuildError> {
        let target = self.ctx.target_dir();

        if self.ctx.project_dir().starts_with(target) || self.ctx.source_dir().starts_with(target)
        {
            return Err(BuildError::UnsafeTarget(target.to_path_buf()));
        }

        match fs::remove_dir_all(target).await {
            Ok(()) => tracing::debug!("Removed {}", target.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(BuildError::fs(target, e)),
        }

        fs::create_dir_all(target)
            .await
            .map_err(|e| BuildError::fs(target, e))
    }

    async fn emit_all(&self, resolved: &[ResolvedArtifact]) -> Result<(), BuildError> {
        for entry in resolved {
            tracing::debug!(
                "Emitting {} via `{}`",
                entry.artifact.route(),
                entry.producer.name()
            );
            entry.producer.emit(&self.ctx, &entry.artifact).await?;
        }
        Ok(())
    }
}
