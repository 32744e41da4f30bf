//! The websocket transport.
//!
//! Remote clients connect to `GET /wcp` and exchange the same JSON
//! envelopes as the stdio transport, one per text frame. Each client gets
//! its own handler task; calls are subject to the session authorization
//! policy.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::dispatch::WcpServer;

/// Errors from the websocket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the listen address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Serve websocket clients on `port` until `shutdown` flips.
///
/// # Errors
///
/// Returns [`TransportError`] if binding or serving fails.
pub async fn run_websocket(
    server: Arc<WcpServer>,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let router = Router::new()
        .route("/wcp", get(ws_upgrade))
        .with_state(server);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "WCP websocket transport listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // Wait until the flag actually flips; a closed channel also
            // means shutdown.
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .map_err(|e| TransportError::Serve(format!("serve error: {e}")))?;

    Ok(())
}

/// Upgrade an HTTP request to a websocket session.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(server): State<Arc<WcpServer>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, server))
}

/// Per-client request/response loop.
async fn handle_socket(mut socket: WebSocket, server: Arc<WcpServer>) {
    debug!("websocket client connected");

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Text(text)) => {
                let response = server.handle_line(text.as_str(), true).await;
                if socket.send(Message::Text(response.into())).await.is_err() {
                    debug!("websocket client disconnected (send failed)");
                    return;
                }
            }
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    debug!("websocket client disconnected (pong failed)");
                    return;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("websocket client disconnected");
                return;
            }
            Ok(_) => {
                // Binary and pong frames are ignored.
            }
            Err(e) => {
                debug!("websocket error: {e}");
                return;
            }
        }
    }
}
