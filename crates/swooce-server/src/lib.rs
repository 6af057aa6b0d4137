//! Development server for swooce sites.
//!
//! Requests are answered straight from a [`SiteIndex`](swooce_core::SiteIndex)
//! by rendering the matching artifact on demand. A file watcher rebuilds the
//! index when sources change and tells connected browsers to reload.

pub mod middleware;
pub mod reload;
pub mod server;
pub mod watcher;

pub use middleware::{serve_artifact, SiteState};
pub use reload::{
    inject_reload_script, reload_client_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};
pub use server::{router, DevServer, DevServerConfig, ServerError};
pub use watcher::{SourceWatcher, WatchEvent};
