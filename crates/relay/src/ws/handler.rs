use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use parlor_common::protocol::ws::CURRENT_PROTOCOL_VERSION;
use tokio::sync::mpsc;
use tracing::warn;

use super::protocol as ws_protocol;
use crate::room::{ConnectionId, OutboundFrame, Room};

#[derive(Clone)]
struct ChatSocketState {
    room: Arc<Room>,
    max_frame_bytes: usize,
}

pub fn router(room: Arc<Room>, max_frame_bytes: usize) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(ChatSocketState { room, max_frame_bytes })
}

async fn ws_upgrade(
    State(state): State<ChatSocketState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let ChatSocketState { room, max_frame_bytes } = state;
    // Clients that offer the versioned subprotocol get it echoed back;
    // clients that offer none are still accepted.
    ws.protocols([CURRENT_PROTOCOL_VERSION])
        .max_frame_size(max_frame_bytes)
        .max_message_size(max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(room, socket, max_frame_bytes))
}

/// Drive one socket until it closes.
///
/// Frames queued by the room are written in order; inbound frames are handed
/// to the room one at a time. Whatever ends the loop, the room hears about
/// the close exactly once.
async fn handle_socket(room: Arc<Room>, mut socket: WebSocket, max_frame_bytes: usize) {
    let (outbound_sender, mut outbound_receiver) = mpsc::unbounded_channel::<OutboundFrame>();
    let connection_id = room.accept(outbound_sender).await;

    loop {
        tokio::select! {
            maybe_outbound = outbound_receiver.recv() => {
                let Some(frame) = maybe_outbound else {
                    break;
                };
                if ws_protocol::send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
            maybe_message = socket.recv() => {
                let Some(message) = maybe_message else {
                    break;
                };
                if !handle_inbound(&room, connection_id, &mut socket, message, max_frame_bytes).await {
                    break;
                }
            }
        }
    }

    room.close(connection_id).await;
}

/// Returns `false` when the socket should be torn down.
async fn handle_inbound(
    room: &Room,
    connection_id: ConnectionId,
    socket: &mut WebSocket,
    message: Result<Message, axum::Error>,
    max_frame_bytes: usize,
) -> bool {
    match message {
        Ok(Message::Text(raw)) => {
            room.handle_frame(connection_id, raw.as_str().as_bytes()).await;
            true
        }
        Ok(Message::Binary(raw)) => {
            room.handle_frame(connection_id, &raw).await;
            true
        }
        // Transport-level keepalive; axum answers pings itself.
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => true,
        Ok(Message::Close(_)) => false,
        Err(error) if ws_protocol::is_frame_size_violation(&error) => {
            ws_protocol::close_frame_too_large(socket, max_frame_bytes).await;
            false
        }
        Err(error) => {
            warn!(connection_id = %connection_id, error = %error, "websocket receive failed");
            false
        }
    }
}
