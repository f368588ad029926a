//! Realtime channel: WebSocket upgrade and per-socket event loop.
//!
//! Identity is carried at connection time via the `userId` query parameter.
//! Sockets without one are anonymous observers: they receive only the
//! connected-count broadcast, never state or volume data, and their inbound
//! events are ignored.
//!
//! Outbound events arrive from the room actor on an unbounded channel and
//! are drained here; inbound text frames carry client events. Either side
//! closing ends the loop, and the room actor is always told about the
//! disconnect.

use crate::actors::messages::ClientEvent;
use crate::actors::RoomHandle;
use crate::routes::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Upgrade to the realtime channel.
///
/// GET /ws
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let room = state.room.clone();
    let user_id = query.user_id.filter(|id| !id.is_empty());

    ws.on_upgrade(move |socket| handle_socket(room, user_id, socket))
}

async fn handle_socket(room: RoomHandle, user_id: Option<String>, mut socket: WebSocket) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let Ok(connection_id) = room.connect(user_id.clone(), outbound_tx).await else {
        return;
    };

    loop {
        tokio::select! {
            maybe_event = outbound_rx.recv() => {
                let Some(event) = maybe_event else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }

            maybe_message = socket.recv() => {
                let Some(message) = maybe_message else { break };

                match message {
                    Ok(Message::Text(raw)) => {
                        let Ok(event) = serde_json::from_str::<ClientEvent>(&raw) else {
                            // Unknown frames are ignored, not fatal.
                            continue;
                        };

                        match event {
                            ClientEvent::Speaking { speaking } => {
                                let Some(uid) = &user_id else { continue };
                                if room.report_speaking(uid.clone(), speaking).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    // Ping/pong is answered at the protocol layer; binary
                    // frames are not part of this channel.
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }
    }

    debug!(
        target: "ps.handlers.ws",
        connection_id = %connection_id,
        "Socket closed"
    );

    let _ = room.disconnect(connection_id).await;
}
