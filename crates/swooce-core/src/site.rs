//! Producers and sites.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::artifact::{Artifact, Route};
use crate::context::{BuildContext, CollisionPolicy};
use crate::emitter::ArtifactEmitter;
use crate::error::{BuildError, RouteCollisionError};
use crate::resolver::ArtifactResolver;

/// A resolver paired with the emitter for everything it resolves.
#[derive(Clone)]
pub struct Producer {
    name: String,
    resolver: Arc<dyn ArtifactResolver>,
    emitter: Arc<dyn ArtifactEmitter>,
}

impl Producer {
    pub fn new(
        name: impl Into<String>,
        resolver: impl ArtifactResolver + 'static,
        emitter: impl ArtifactEmitter + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            resolver: Arc::new(resolver),
            emitter: Arc::new(emitter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn emitter(&self) -> &Arc<dyn ArtifactEmitter> {
        &self.emitter
    }

    /// Run this producer's resolver.
    pub async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
        self.resolver.resolve(ctx).await
    }

    /// Render `artifact` to its target location with this producer's emitter.
    pub async fn emit(&self, ctx: &BuildContext, artifact: &Artifact) -> Result<(), BuildError> {
        Ok(self.emitter.emit(ctx, artifact).await?)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An artifact together with the producer that resolved it.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub artifact: Artifact,
    pub producer: Producer,
}

impl ResolvedArtifact {
    fn describe(&self) -> String {
        match self.artifact.source() {
            Some(source) => format!(
                "{} (producer `{}`)",
                source.display(),
                self.producer.name()
            ),
            None => format!("producer `{}`", self.producer.name()),
        }
    }
}

/// The ordered list of producers that make up a site.
#[derive(Debug, Clone, Default)]
pub struct Site {
    producers: Vec<Producer>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn producers(&self) -> &[Producer] {
        &self.producers
    }

    /// Run every producer's resolver in registration order.
    ///
    /// Artifacts come back in producer order, then resolver order, with the
    /// context's collision policy applied.
    pub async fn resolve(
        &self,
        ctx: &BuildContext,
    ) -> Result<Vec<ResolvedArtifact>, BuildError> {
        let mut resolved = Vec::new();

        for producer in &self.producers {
            let artifacts = producer.resolve(ctx).await?;
            tracing::debug!(
                "Producer `{}` resolved {} artifacts",
                producer.name(),
                artifacts.len()
            );
            resolved.extend(artifacts.into_iter().map(|artifact| ResolvedArtifact {
                artifact,
                producer: producer.clone(),
            }));
        }

        Ok(apply_collision_policy(resolved, ctx.collision_policy())?)
    }
}

fn apply_collision_policy(
    resolved: Vec<ResolvedArtifact>,
    policy: CollisionPolicy,
) -> Result<Vec<ResolvedArtifact>, RouteCollisionError> {
    let mut kept: Vec<Option<ResolvedArtifact>> = Vec::with_capacity(resolved.len());
    let mut slots: HashMap<Route, usize> = HashMap::new();

    for entry in resolved {
        let Some(&slot) = slots.get(entry.artifact.route()) else {
            slots.insert(entry.artifact.route().clone(), kept.len());
            kept.push(Some(entry));
            continue;
        };

        // Slots only ever hold the current owner of their route
        let Some(existing) = kept[slot].as_ref() else {
            continue;
        };

        match policy {
            CollisionPolicy::Fail => {
                return Err(RouteCollisionError {
                    route: entry.artifact.route().clone(),
                    first: existing.describe(),
                    second: entry.describe(),
                });
            }
            CollisionPolicy::FirstWins => {
                tracing::warn!(
                    "Route {} from {} ignored; already produced by {}",
                    entry.artifact.route(),
                    entry.describe(),
                    existing.describe()
                );
            }
            CollisionPolicy::LastWins => {
                tracing::warn!(
                    "Route {} from {} replaced by {}",
                    entry.artifact.route(),
                    existing.describe(),
                    entry.describe()
                );
                kept[slot] = None;
                slots.insert(entry.artifact.route().clone(), kept.len());
                kept.push(Some(entry));
            }
        }
    }

    Ok(kept.into_iter().flatten().collect())
}
