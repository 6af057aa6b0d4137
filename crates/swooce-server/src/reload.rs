//! Live reload over WebSocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint browsers connect to.
pub const RELOAD_SOCKET_PATH: &str = "/__swooce/reload";

/// Client script served to browsers.
pub const RELOAD_SCRIPT_PATH: &str = "/__swooce/reload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Sources changed and the site index was rebuilt
    Reload,

    /// Sources changed but the site index could not be rebuilt
    BuildFailed { message: String },
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side script that reloads the page when the site changes.
///
/// `socket_path` is resolved against the page's own host.
pub fn reload_client_script(socket_path: &str) -> String {
    format!(
        r#"(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{socket_path}');

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'build_failed':
        console.error('[swooce] Build failed:', msg.message);
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[swooce] Disconnected, retrying...');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#
    )
}

/// Insert the reload script tag before the closing `</body>`, or append it
/// when the document has none.
pub fn inject_reload_script(html: &str) -> String {
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);

    match html.rfind("</body>") {
        Some(pos) => format!("{}{}\n{}", &html[..pos], tag, &html[pos..]),
        None => format!("{html}\n{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn sending_without_clients_is_silent() {
        ReloadHub::new().send(ReloadMessage::Reload);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::BuildFailed {
            message: "No route convention covers /x".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(
            json,
            r#"{"type":"build_failed","message":"No route convention covers /x"}"#
        );
    }

    #[test]
    fn script_connects_to_socket_path() {
        let script = reload_client_script(RELOAD_SOCKET_PATH);

        assert!(script.contains("location.host + '/__swooce/reload'"));
    }

    #[test]
    fn injects_before_closing_body() {
        let html = "<html><body><h1>Hi</h1></body></html>";

        assert_eq!(
            inject_reload_script(html),
            "<html><body><h1>Hi</h1><script src=\"/__swooce/reload.js\"></script>\n</body></html>"
        );
    }

    #[test]
    fn appends_without_body() {
        let injected = inject_reload_script("<h1>Hi</h1>");

        assert!(injected.starts_with("<h1>Hi</h1>\n<script"));
    }
}
