//! WebSocket-based live reload.

use pipewright_pipeline::ReloadNotifier;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint clients connect to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const LIVERELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveReloadMessage {
    /// Full page reload
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<LiveReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: LiveReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadNotifier for LiveReloadHub {
    fn reload(&self, changed: &str) {
        tracing::debug!(
            "Reloading {} clients after '{}'",
            self.subscriber_count(),
            changed
        );
        self.send(LiveReloadMessage::Reload);
    }
}

/// Tag inserted into served HTML pages.
pub fn script_tag() -> String {
    format!("<script src=\"{}\"></script>", LIVERELOAD_SCRIPT_PATH)
}

/// Insert the client script tag before the last `</body>`, or append it
/// when the page has none.
pub fn inject_script(html: &str) -> String {
    let tag = script_tag();
    match html.rfind("</body>") {
        Some(index) => format!("{}{}{}", &html[..index], tag, &html[index..]),
        None => format!("{}{}", html, tag),
    }
}

/// Client-side script: reconnects with backoff and reloads on request.
pub fn client_script() -> String {
    format!(
        r#"(function() {{
  'use strict';

  var attempts = 0;

  function connect() {{
    var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
    var ws = new WebSocket(scheme + location.host + '{}');

    ws.onopen = function() {{
      attempts = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {{
        location.reload();
      }} else if (msg.type === 'connected') {{
        console.log('[livereload] connected');
      }}
    }};

    ws.onclose = function() {{
      if (attempts < 10) {{
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        LIVERELOAD_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = LiveReloadHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.reload("dist");

        assert_eq!(first.try_recv().unwrap(), LiveReloadMessage::Reload);
        assert_eq!(second.try_recv().unwrap(), LiveReloadMessage::Reload);
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn sending_without_clients_is_harmless() {
        let hub = LiveReloadHub::new();

        hub.reload("less");

        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        assert_eq!(
            serde_json::to_string(&LiveReloadMessage::Reload).unwrap(),
            r#"{"type":"reload"}"#
        );
        assert_eq!(
            serde_json::to_string(&LiveReloadMessage::Connected).unwrap(),
            r#"{"type":"connected"}"#
        );
    }

    #[test]
    fn injects_before_closing_body() {
        let html = "<html><body><p>hi</p></body></html>";

        assert_eq!(
            inject_script(html),
            "<html><body><p>hi</p><script src=\"/__livereload.js\"></script></body></html>"
        );
        assert!(inject_script("<p>fragment</p>").ends_with(&script_tag()));
    }

    #[test]
    fn client_script_targets_endpoint() {
        assert!(client_script().contains("'/__livereload'"));
    }
}
