//! Per-connection WebSocket lifecycle and inbound event dispatch.
//!
//! One read loop per connection keeps a client's own events in arrival
//! order; outbound frames go through an unbounded channel to a dedicated
//! write task so fan-out never blocks on a slow socket.

use std::sync::Arc;

use {
    axum::extract::ws::{Message, WebSocket},
    chrono::Utc,
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info},
    uuid::Uuid,
};

use {
    studyhall_presence::ConnectionId,
    studyhall_protocol::{ClientEvent, MessageEnvelope, MessageOrigin, ServerEvent},
};

use crate::{auth::Identity, state::GatewayState};

/// Drive an authenticated connection until it closes, then clean up its
/// registry and room state.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, identity: Identity) {
    let conn_id: ConnectionId = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state.hub.register(conn_id, &identity, tx);
    info!(%conn_id, user_id = %identity.user_id, "connection opened");

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => handle_event(&state, conn_id, &identity, event),
                // Malformed frames are dropped, not connection errors.
                Err(e) => debug!(%conn_id, error = %e, "dropping malformed frame"),
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // Abrupt or graceful, the cleanup is the same.
    let rooms = state.hub.deregister(conn_id, &identity.user_id);
    for room in &rooms {
        state.hub.broadcast(
            room,
            &ServerEvent::user_left(&identity.user_id, &identity.display_name),
        );
    }
    write_task.abort();
    info!(%conn_id, user_id = %identity.user_id, rooms = rooms.len(), "connection closed");
}

fn handle_event(
    state: &GatewayState,
    conn_id: ConnectionId,
    identity: &Identity,
    event: ClientEvent,
) {
    let hub = &state.hub;
    match event {
        ClientEvent::JoinRoom { room_id } => {
            if hub.join_room(conn_id, &room_id) {
                debug!(%conn_id, room = %room_id, "joined room");
                hub.broadcast_except(
                    &room_id,
                    conn_id,
                    &ServerEvent::user_joined(&identity.user_id, &identity.display_name),
                );
            }
        },
        ClientEvent::LeaveRoom { room_id } => {
            if hub.leave_room(conn_id, &room_id) {
                debug!(%conn_id, room = %room_id, "left room");
                hub.broadcast(
                    &room_id,
                    &ServerEvent::user_left(&identity.user_id, &identity.display_name),
                );
            }
        },
        ClientEvent::SendMessage { text, chat_room } => {
            // Live preview path: transient envelope, temporary id, never
            // persisted. The durable path re-announces under the store id.
            let envelope = MessageEnvelope {
                id: Uuid::new_v4().to_string(),
                text,
                user_id: identity.user_id.clone(),
                username: identity.display_name.clone(),
                chat_room: chat_room.clone(),
                timestamp: Utc::now(),
                origin: MessageOrigin::Transient,
            };
            hub.broadcast(&chat_room, &ServerEvent::NewMessage(envelope));
        },
        ClientEvent::TypingStart { chat_room } => {
            hub.broadcast_except(&chat_room, conn_id, &ServerEvent::UserTyping {
                user_id: identity.user_id.clone(),
                username: identity.display_name.clone(),
            });
        },
        ClientEvent::TypingStop { chat_room } => {
            hub.broadcast_except(&chat_room, conn_id, &ServerEvent::UserStoppedTyping {
                user_id: identity.user_id.clone(),
            });
        },
    }
}
