//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::{AppState, ConnectionInfo};
use crate::game::{ArenaCommand, ConnectionId};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound messages buffered per connection before snapshots start being dropped
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    state.connections.insert(
        connection_id,
        ConnectionInfo {
            connected_at: unix_millis(),
        },
    );

    run_session(connection_id, ws_sink, ws_stream, &state).await;

    // Cleanup on disconnect
    let connected_for_ms = state
        .connections
        .remove(&connection_id)
        .map(|(_, info)| unix_millis().saturating_sub(info.connected_at))
        .unwrap_or(0);

    info!(connection_id = %connection_id, connected_for_ms, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    state: &AppState,
) {
    let rate_limiter = ConnectionRateLimiter::new();
    let command_tx = state.arena.command_tx.clone();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_QUEUE_SIZE);

    // Spawn writer task: arena messages -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                // INPUT is never limited: the newest direction must always reach the arena
                let command = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Input { direction }) => ArenaCommand::Input {
                        connection_id,
                        direction,
                    },
                    Ok(ClientMsg::JoinGame { username }) => {
                        if !rate_limiter.check() || !rate_limiter.check_join() {
                            warn!(connection_id = %connection_id, "Rate limited join");
                            continue;
                        }
                        ArenaCommand::Join {
                            connection_id,
                            username,
                            outbound: outbound_tx.clone(),
                        }
                    }
                    Err(e) => {
                        if rate_limiter.check() {
                            warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                        }
                        continue;
                    }
                };

                if command_tx.send(command).await.is_err() {
                    error!(connection_id = %connection_id, "Arena command channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // A dropped connection is a leave, no grace period
    let _ = command_tx.send(ArenaCommand::Leave { connection_id }).await;

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
