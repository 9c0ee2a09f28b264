//! Development server implementation.

use std::path::PathBuf;

use axum::{
    body::{self, Body},
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
use tower_http::services::ServeDir;

use crate::livereload::{
    client_script, inject_script, LiveReloadHub, LiveReloadMessage, LIVERELOAD_PATH,
    LIVERELOAD_SCRIPT_PATH,
};

/// Largest HTML page the script is injected into.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            port: 8080,
            host: "localhost".to_string(),
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {message}")]
    BindError { addr: String, message: String },

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Development server: static files plus live reload.
pub struct DevServer {
    config: DevServerConfig,
    hub: LiveReloadHub,
}

impl DevServer {
    /// Create a server broadcasting through `hub`.
    pub fn new(config: DevServerConfig, hub: LiveReloadHub) -> Self {
        Self { config, hub }
    }

    /// Routes: the live-reload endpoints, everything else from the root
    /// directory with the client script injected into HTML pages.
    pub fn router(&self) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(ws_handler))
            .route(LIVERELOAD_SCRIPT_PATH, get(script_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .layer(middleware::map_response(inject_livereload))
            .with_state(self.hub.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::BindError {
                addr: addr.clone(),
                message: e.to_string(),
            })?;

        let url = format!("http://{}", addr);
        tracing::info!("Serving {} at {}", self.config.root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

/// Handler for the live-reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: LiveReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &LiveReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            // Missed messages were reloads too; the next one is enough
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &LiveReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the client script.
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        client_script(),
    )
}

/// Add the client script tag to complete HTML responses.
async fn inject_livereload(response: Response) -> Response {
    // Partial content must keep matching its Content-Range
    if response.status() != StatusCode::OK {
        return response;
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read HTML response: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    if bytes.is_empty() {
        return Response::from_parts(parts, Body::empty());
    }

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}
