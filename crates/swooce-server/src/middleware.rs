//! Serve-mode middleware: answers requests by rendering indexed artifacts.

use std::borrow::Cow;
use std::io::{self, Cursor};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tokio_util::io::ReaderStream;

use swooce_core::{BuildContext, BuildError, IndexEntry, Route, Site, SiteIndex};

use crate::reload::inject_reload_script;
use crate::server::ServerError;

/// Paths below this prefix belong to the dev server itself.
const RESERVED_PREFIX: &str = "/__swooce/";

/// Candidates for a request path ending in `/`. The second is the route of
/// an `index.html` page module.
const DIRECTORY_INDEXES: &[&str] = &["index.html", "index.html.html"];

const STREAM_BUFFER: usize = 64 * 1024;

/// Shared state of the serve-mode middleware.
#[derive(Clone)]
pub struct SiteState {
    ctx: Arc<BuildContext>,
    index: Arc<RwLock<SiteIndex>>,
    live_reload: bool,
}

impl SiteState {
    pub fn new(ctx: BuildContext, index: SiteIndex) -> Self {
        Self {
            ctx: Arc::new(ctx),
            index: Arc::new(RwLock::new(index)),
            live_reload: false,
        }
    }

    /// Inject the live reload script into HTML responses.
    pub fn with_live_reload(mut self, enabled: bool) -> Self {
        self.live_reload = enabled;
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Find the entry for a decoded request path. Paths ending in `/` fall
    /// back to their directory index.
    pub async fn lookup(&self, path: &str) -> Option<IndexEntry> {
        let index = self.index.read().await;

        index
            .get(path)
            .or_else(|| {
                if !path.ends_with('/') {
                    return None;
                }
                DIRECTORY_INDEXES
                    .iter()
                    .find_map(|name| index.get(&format!("{path}{name}")))
            })
            .cloned()
    }

    pub async fn routes(&self) -> Vec<Route> {
        self.index.read().await.routes().cloned().collect()
    }

    /// Re-resolve the site and swap in the new index.
    ///
    /// On failure the previous index stays in place.
    pub async fn rebuild(&self, site: &Site) -> Result<usize, BuildError> {
        let index = SiteIndex::build(&self.ctx, site).await?;
        let routes = index.len();
        *self.index.write().await = index;
        Ok(routes)
    }
}

/// Axum middleware rendering indexed artifacts on demand.
///
/// Unknown paths pass through to the next handler, as do paths that are not
/// valid percent-encoded UTF-8. Render failures become a 500 response and
/// are logged.
pub async fn serve_artifact(
    State(state): State<SiteState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(path) = decode_path(request.uri().path()) else {
        return next.run(request).await;
    };

    if path.starts_with(RESERVED_PREFIX) {
        return next.run(request).await;
    }

    let Some(entry) = state.lookup(&path).await else {
        return next.run(request).await;
    };

    match render(&state, entry).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("{}", e);
            e.into_response()
        }
    }
}

fn decode_path(path: &str) -> Option<String> {
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

async fn render(state: &SiteState, entry: IndexEntry) -> Result<Response, ServerError> {
    let route = entry.artifact.route().clone();
    let mime_type = entry.artifact.mime_type().map(str::to_string);
    let is_html = mime_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("text/html"));

    let body = if state.live_reload && is_html {
        let mut markup = Vec::new();
        entry.write(state.context(), &mut markup).await?;
        Body::from(inject_reload_script(&String::from_utf8_lossy(&markup)))
    } else {
        stream(state, entry).await?
    };

    let mut response = Response::new(body);
    if let Some(value) = mime_type.and_then(|mime| HeaderValue::from_str(&mime).ok()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }

    tracing::debug!("Rendered {}", route);
    Ok(response)
}

/// Write the artifact through a pipe straight into the response body.
///
/// The response is committed once the first bytes arrive, so an artifact
/// that fails before producing output still answers with an error.
async fn stream(state: &SiteState, entry: IndexEntry) -> Result<Body, ServerError> {
    let (mut reader, mut writer) = tokio::io::duplex(STREAM_BUFFER);
    let ctx = Arc::clone(&state.ctx);
    let route = entry.artifact.route().clone();

    let task = tokio::spawn(async move { entry.write(&ctx, &mut writer).await });

    let mut head = vec![0; STREAM_BUFFER];
    let read = reader.read(&mut head).await?;
    if read == 0 {
        task.await.map_err(|e| ServerError::Serve(io::Error::other(e)))??;
        return Ok(Body::empty());
    }
    head.truncate(read);

    tokio::spawn(async move {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Failed to stream {}: {}", route, e),
            Err(e) => tracing::error!("Render task for {} panicked: {}", route, e),
        }
    });

    let body = Cursor::new(head).chain(reader);
    Ok(Body::from_stream(ReaderStream::new(body)))
}
