//! Development server implementation.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::broadcast::error::RecvError;

use swooce_core::{BuildContext, EmitError, Site, SiteIndex};

use crate::middleware::{serve_artifact, SiteState};
use crate::reload::{
    reload_client_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH, RELOAD_SOCKET_PATH,
};
use crate::watcher::SourceWatcher;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,

    /// Reload browsers when sources change
    pub live_reload: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: true,
            live_reload: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error(transparent)]
    Render(#[from] EmitError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Router serving the site, the reload socket and the reload script.
///
/// Requests no artifact answers get a plain 404.
pub fn router(state: SiteState, hub: ReloadHub) -> Router {
    Router::new()
        .route(RELOAD_SOCKET_PATH, get(ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state, serve_artifact))
        .with_state(hub)
}

/// Development server.
pub struct DevServer {
    ctx: BuildContext,
    site: Site,
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(ctx: BuildContext, site: Site, config: DevServerConfig) -> Self {
        Self { ctx, site, config }
    }

    /// Index the site, watch its sources and serve until shut down.
    ///
    /// A site that fails to index still starts serving; the error is logged
    /// and the next source change retries.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let index = match SiteIndex::build(&self.ctx, &self.site).await {
            Ok(index) => {
                tracing::info!("Indexed {} routes", index.len());
                index
            }
            Err(e) => {
                tracing::error!("Failed to index site: {}", e);
                SiteIndex::default()
            }
        };

        let state =
            SiteState::new(self.ctx.clone(), index).with_live_reload(self.config.live_reload);
        let hub = ReloadHub::new();

        let (watcher, mut rx) = SourceWatcher::new(&[self.ctx.source_dir().to_path_buf()])
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let watch_state = state.clone();
        let watch_hub = hub.clone();
        let site = self.site;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::info!("Changed: {}", event.path().display());

                match watch_state.rebuild(&site).await {
                    Ok(routes) => {
                        tracing::info!("Reindexed {} routes", routes);
                        watch_hub.send(ReloadMessage::Reload);
                    }
                    Err(e) => {
                        tracing::error!("Failed to reindex site: {}", e);
                        watch_hub.send(ReloadMessage::BuildFailed {
                            message: e.to_string(),
                        });
                    }
                }
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(state, hub);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        tracing::info!("Dev server running at http://{}", addr);

        if self.config.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if !send_message(&mut socket, &ReloadMessage::Connected).await {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if !send_message(&mut socket, &msg).await {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

/// Returns false once the client is gone.
async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> bool {
    let Ok(json) = serde_json::to_string(msg) else {
        return false;
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(RELOAD_SOCKET_PATH),
    )
}
