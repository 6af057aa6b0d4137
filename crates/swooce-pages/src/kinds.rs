//! Page kinds: how a file under the pages directory becomes a page.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use swooce_core::{
    scan_glob, Artifact, ArtifactResolver, BoxError, BuildContext, BuildError, Content,
    ContentSource, Route,
};

use crate::document::{escape_html, HtmlDocument};

/// Errors raised while reading page sources.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Page {route} has no source file")]
    NoSource { route: Route },

    #[error("Failed to read page {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid listing {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A listing page, declared in TOML.
///
/// ```toml
/// title = "Blog"
/// pattern = "post/*.md"
/// intro = "Everything I wrote down."
/// ```
///
/// `pattern` is matched relative to the listing file's directory.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,

    pub pattern: String,

    #[serde(default)]
    pub intro: Option<String>,
}

impl Listing {
    pub fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

/// How a page module renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// The file is a complete HTML document
    Html,

    /// The file's text is shown in a `<pre>` block
    Preformatted,

    /// The file declares a [`Listing`]
    Listing,
}

/// Resolver exported by one page file.
#[derive(Debug, Clone)]
pub struct PageModule {
    module: PathBuf,
    kind: PageKind,
}

impl PageModule {
    pub fn new(module: impl Into<PathBuf>, kind: PageKind) -> Self {
        Self {
            module: module.into(),
            kind,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    async fn listing(&self, ctx: &BuildContext) -> Result<ListingSource, BuildError> {
        let text = read_text(&self.module)
            .await
            .map_err(|e| BuildError::Resolve(e.to_string()))?;
        let listing = Listing::parse(&text).map_err(|source| {
            let error = PageError::Listing {
                path: self.module.clone(),
                source,
            };
            BuildError::Resolve(error.to_string())
        })?;

        let base = self.module.parent().unwrap_or(Path::new(""));
        let links = scan_glob(base, &listing.pattern)
            .await?
            .iter()
            .map(|page| ctx.resolve_route(page))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Listing {} links {} pages",
            self.module.display(),
            links.len()
        );

        Ok(ListingSource { listing, links })
    }
}

#[async_trait]
impl ArtifactResolver for PageModule {
    async fn resolve(&self, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
        let page = Artifact::new(ctx.resolve_route(&self.module)?)
            .with_source(self.module.clone())
            .with_mime_type("text/html");

        let page = match self.kind {
            PageKind::Html => page.with_content(HtmlSource),
            PageKind::Preformatted => page.with_content(PreformattedSource),
            PageKind::Listing => page.with_content(self.listing(ctx).await?),
        };

        Ok(vec![page])
    }
}

struct HtmlSource;

#[async_trait]
impl ContentSource for HtmlSource {
    async fn fetch(&self, _ctx: &BuildContext, artifact: &Artifact) -> Result<Content, BoxError> {
        let markup = read_source(artifact).await?;
        Ok(Content::Document(Box::new(HtmlDocument::from_markup(markup))))
    }
}

struct PreformattedSource;

#[async_trait]
impl ContentSource for PreformattedSource {
    async fn fetch(&self, _ctx: &BuildContext, artifact: &Artifact) -> Result<Content, BoxError> {
        let text = read_source(artifact).await?;
        let title = artifact
            .source()
            .and_then(Path::file_stem)
            .and_then(|stem| stem.to_str())
            .unwrap_or("Untitled");

        let body = format!("    <pre>{}</pre>", escape_html(&text));
        Ok(Content::Document(Box::new(HtmlDocument::page(title, &body))))
    }
}

struct ListingSource {
    listing: Listing,
    links: Vec<Route>,
}

#[async_trait]
impl ContentSource for ListingSource {
    async fn fetch(&self, _ctx: &BuildContext, _artifact: &Artifact) -> Result<Content, BoxError> {
        let mut body = String::new();

        if let Some(intro) = &self.listing.intro {
            body.push_str(&format!("    <p>{}</p>\n", escape_html(intro)));
        }

        body.push_str("    <ul>\n");
        for link in &self.links {
            let href = escape_html(link.as_str());
            body.push_str(&format!("      <li><a href=\"{href}\">{href}</a></li>\n"));
        }
        body.push_str("    </ul>");

        Ok(Content::Document(Box::new(HtmlDocument::page(
            &self.listing.title,
            &body,
        ))))
    }
}

async fn read_source(artifact: &Artifact) -> Result<String, PageError> {
    let source = artifact.source().ok_or_else(|| PageError::NoSource {
        route: artifact.route().clone(),
    })?;
    read_text(source).await
}

async fn read_text(path: &Path) -> Result<String, PageError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PageError::Read {
            path: path.to_path_buf(),
            source,
        })
}
