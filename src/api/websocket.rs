use crate::hub::HubHandle;
use crate::registry::ConnectionId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared application state for the WebSocket and status handlers
#[derive(Clone)]
pub struct RelayAppState {
    pub hub: HubHandle,
    /// Per-connection outbound queue length
    pub outbound_buffer: usize,
}

/// GET / and GET /ws - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayAppState>>,
) -> Response {
    debug!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<RelayAppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket connection lifecycle.
///
/// Inbound text frames go to the hub in arrival order; the hub's outbound
/// queue for this connection is drained to the socket. Either side ending
/// closes the connection and unregisters it.
async fn handle_socket(mut socket: WebSocket, state: Arc<RelayAppState>) {
    let id = ConnectionId::next();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Arc<str>>(state.outbound_buffer.max(1));

    if state.hub.connect(id, outbound_tx).await.is_err() {
        warn!(connection_id = %id, "Hub not running, dropping connection");
        return;
    }

    loop {
        tokio::select! {
            // Handle incoming client messages
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if state.hub.message(id, text).await.is_err() {
                            warn!(connection_id = %id, "Hub stopped mid-connection");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection_id = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection_id = %id, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Ignore binary, pong messages
                    }
                    Some(Err(e)) => {
                        warn!(connection_id = %id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            // Forward envelopes queued by the hub
            payload = outbound_rx.recv() => {
                match payload {
                    Some(payload) => {
                        if let Err(e) = socket.send(Message::Text(payload.to_string())).await {
                            debug!(connection_id = %id, error = %e, "Failed to send message");
                            break;
                        }
                    }
                    None => {
                        // Hub dropped this connection
                        break;
                    }
                }
            }
        }
    }

    // Hub may already be gone on shutdown
    let _ = state.hub.disconnect(id).await;
    info!(connection_id = %id, "WebSocket handler finished");
}
