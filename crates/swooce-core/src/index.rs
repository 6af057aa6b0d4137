//! Route-keyed lookup table for serving artifacts on demand.

use std::collections::BTreeMap;

use tokio::io::AsyncWrite;

use crate::artifact::{Artifact, Route};
use crate::context::BuildContext;
use crate::error::{BuildError, EmitError};
use crate::site::{Producer, Site};

/// An indexed artifact and the producer that resolved it.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub artifact: Artifact,
    pub producer: Producer,
}

impl IndexEntry {
    /// Render the artifact into `sink` with its producer's emitter.
    pub async fn write(
        &self,
        ctx: &BuildContext,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), EmitError> {
        self.producer
            .emitter()
            .write(ctx, &self.artifact, sink)
            .await
    }
}

/// Every route of a site, resolved once without emitting anything.
///
/// The index is a snapshot; rebuild it to pick up source changes.
#[derive(Debug, Clone, Default)]
pub struct SiteIndex {
    entries: BTreeMap<Route, IndexEntry>,
}

impl SiteIndex {
    /// Run every producer's resolver once and index the results by route.
    ///
    /// Collisions follow the context's collision policy, exactly as in a build.
    pub async fn build(ctx: &BuildContext, site: &Site) -> Result<Self, BuildError> {
        let resolved = site.resolve(ctx).await?;

        let entries = resolved
            .into_iter()
            .map(|r| {
                (
                    r.artifact.route().clone(),
                    IndexEntry {
                        artifact: r.artifact,
                        producer: r.producer,
                    },
                )
            })
            .collect();

        Ok(Self { entries })
    }

    /// Look up a request path.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in route order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Routes in sorted order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::tempdir;

    use crate::artifact::StaticContent;
    use crate::context::ContextConfig;
    use crate::emitter::{ContentEmitter, CopyEmitter};
    use crate::resolver::{FactoryGlobResolver, SearchRoot};

    fn site() -> Site {
        let pages = |ctx: &BuildContext| -> Result<Vec<Artifact>, BuildError> {
            let page = Artifact::from_source(ctx, ctx.pages_dir().join("index.ts"))?
                .with_content(StaticContent("<h1>Index</h1>".to_string()));
            Ok(vec![page])
        };

        Site::new()
            .with_producer(Producer::new("pages", pages, ContentEmitter::new()))
            .with_producer(Producer::new(
                "static",
                FactoryGlobResolver::source_files(SearchRoot::Source("static".into()), "**/*"),
                CopyEmitter,
            ))
    }

    #[tokio::test]
    async fn indexes_every_route() {
        let temp = tempdir().unwrap();
        let ctx = BuildContext::new(temp.path(), &ContextConfig::default());
        fs::create_dir_all(&ctx.static_dirs()[0]).unwrap();
        fs::write(ctx.static_dirs()[0].join("logo.png"), [1u8, 2, 3]).unwrap();

        let index = SiteIndex::build(&ctx, &site()).await.unwrap();

        let routes: Vec<&str> = index.routes().map(Route::as_str).collect();
        assert_eq!(routes, vec!["/index.ts.html", "/logo.png"]);
        assert_eq!(index.get("/logo.png").unwrap().producer.name(), "static");
        assert!(index.get("/missing.html").is_none());
        assert!(!ctx.target_dir().exists());
    }

    #[tokio::test]
    async fn entries_render_through_their_producer() {
        let temp = tempdir().unwrap();
        let ctx = BuildContext::new(temp.path(), &ContextConfig::default());

        let index = SiteIndex::build(&ctx, &site()).await.unwrap();
        let entry = index.get("/index.ts.html").unwrap();

        let mut body = Vec::new();
        entry.write(&ctx, &mut body).await.unwrap();

        assert_eq!(body, b"<h1>Index</h1>");
        assert_eq!(entry.artifact.mime_type(), Some("text/html"));
    }
}
