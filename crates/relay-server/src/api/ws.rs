//! WebSocket push transport
//!
//! `GET /api/rooms/{room_id}/ws?userId=` upgrades the connection. Being
//! connected is membership: the upgrade joins the room, and the socket
//! closing (or an explicit leave frame) leaves it. Outbound frames flow
//! through the connection registry, which holds the only sender for this
//! socket's queue; the registry dropping it (leave, expiry, room removal)
//! is what closes the socket. The loop here only reads client frames.
//!
//! Any inbound frame, pings and pongs included, refreshes the
//! participant's liveness stamp. The server pings each connection on a
//! cadence inside the liveness window; the pong a client stack answers
//! with (browsers do this automatically) is what keeps a quiet but
//! connected participant from being expired.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use signalhub_room_core::{ParticipantId, RoomId};

use crate::error::{Result, ServerError};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub user_id: Option<String>,
}

/// GET /api/rooms/{room_id}/ws?userId=
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response> {
    let user_id = match query.user_id {
        Some(user_id) if !user_id.is_empty() => user_id,
        _ => return Err(ServerError::bad_request("userId is required")),
    };
    let room_id = RoomId::from(room_id);
    let participant_id = ParticipantId::from(user_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, participant_id)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    room_id: RoomId,
    participant_id: ParticipantId,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Register before joining so nothing published by the join itself or by
    // concurrent room activity can slip past this connection. The registry
    // takes the sender outright.
    let connection_id = state.connections.register(&room_id, &participant_id, tx);

    if let Err(e) = state.directory.join(&room_id, &participant_id).await {
        warn!(room = %room_id, participant = %participant_id, error = %e, "ws join rejected");
        state.connections.unregister(&room_id, connection_id);
        let frame = ServerFrame::Error {
            message: e.to_string(),
        };
        if let Ok(text) = serde_json::to_string(&frame) {
            let _ = sink.send(Message::Text(text)).await;
        }
        let _ = sink.close().await;
        return;
    }

    // Membership snapshot for this connection only.
    let users = state.directory.list_participants(&room_id);
    state
        .connections
        .send_to_connection(&room_id, connection_id, &ServerFrame::RoomUsers { users });

    // Outbound pump: the registry's queue feeds the socket. The queue
    // closing closes the socket.
    let mut outbound_task = tokio::spawn(async move {
        let mut outbound = UnboundedReceiverStream::new(rx);
        while let Some(message) = outbound.next().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let inbound_state = state.clone();
    let inbound_room = room_id.clone();
    let inbound_participant = participant_id.clone();
    let mut inbound_task = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    inbound_state
                        .directory
                        .touch(&inbound_room, &inbound_participant);
                    let keep_going = dispatch_frame(
                        &inbound_state,
                        &inbound_room,
                        &inbound_participant,
                        connection_id,
                        &text,
                    )
                    .await;
                    if !keep_going {
                        break;
                    }
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    inbound_state
                        .directory
                        .touch(&inbound_room, &inbound_participant);
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    // Either direction ending tears the connection down.
    tokio::select! {
        _ = &mut outbound_task => inbound_task.abort(),
        _ = &mut inbound_task => outbound_task.abort(),
    }

    state.connections.unregister(&room_id, connection_id);
    debug!(room = %room_id, participant = %participant_id, "ws disconnected");
    if let Err(e) = state.directory.leave(&room_id, &participant_id).await {
        warn!(room = %room_id, participant = %participant_id, error = %e, "leave after disconnect failed");
    }
}

/// Handle one inbound frame. Returns false when the connection should end.
async fn dispatch_frame(
    state: &AppState,
    room_id: &RoomId,
    participant_id: &ParticipantId,
    connection_id: u64,
    text: &str,
) -> bool {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            state.connections.send_to_connection(
                room_id,
                connection_id,
                &ServerFrame::Error {
                    message: format!("invalid frame: {}", e),
                },
            );
            return true;
        }
    };

    match frame {
        ClientFrame::Chat { text } => {
            if let Err(e) = state.directory.post_chat(room_id, participant_id, &text).await {
                state.connections.send_to_connection(
                    room_id,
                    connection_id,
                    &ServerFrame::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        ClientFrame::Signal { to, kind, payload } => {
            let to = ParticipantId::from(to);
            let payload = match serde_json::value::to_raw_value(&payload) {
                Ok(payload) => payload,
                Err(e) => {
                    state.connections.send_to_connection(
                        room_id,
                        connection_id,
                        &ServerFrame::Error {
                            message: format!("invalid payload: {}", e),
                        },
                    );
                    return true;
                }
            };
            if let Err(e) = state
                .directory
                .post_signal(room_id, participant_id, &to, kind, payload)
                .await
            {
                state.connections.send_to_connection(
                    room_id,
                    connection_id,
                    &ServerFrame::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        ClientFrame::ScreenShare { active } => {
            // Transient relay to the rest of the room; never logged.
            state.connections.broadcast(
                room_id,
                &ServerFrame::ScreenShare {
                    user_id: participant_id.clone(),
                    active,
                },
                Some(participant_id),
            );
        }
        ClientFrame::Leave => return false,
    }
    true
}
