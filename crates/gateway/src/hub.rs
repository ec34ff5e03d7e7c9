use {
    async_trait::async_trait,
    dashmap::DashMap,
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use {
    studyhall_chat::RoomFanout,
    studyhall_presence::{ConnectionId, ConnectionRegistry, RoomMultiplexer},
    studyhall_protocol::ServerEvent,
};

use crate::auth::Identity;

// ── Connection handle ────────────────────────────────────────────────────────

/// A live WebSocket connection as seen by the hub.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub conn_id: ConnectionId,
    pub user_id: String,
    pub display_name: String,
    /// Channel for sending serialized frames to this client's write loop.
    sender: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Send a serialized JSON frame to this client.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

// ── Realtime hub ─────────────────────────────────────────────────────────────

/// Shared realtime state: live connections plus the two presence indices.
/// Process-local; correctness is only guaranteed within one server process.
#[derive(Debug, Default)]
pub struct RealtimeHub {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    registry: ConnectionRegistry,
    rooms: RoomMultiplexer,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection. A second login by the same user
    /// displaces the registry entry; the older connection keeps its rooms but
    /// no longer receives user-targeted sends.
    pub fn register(
        &self,
        conn_id: ConnectionId,
        identity: &Identity,
        sender: mpsc::UnboundedSender<String>,
    ) {
        if let Some(displaced) = self.registry.bind(&identity.user_id, conn_id) {
            debug!(user_id = %identity.user_id, ?displaced, "registry entry displaced by new login");
        }
        self.connections.insert(conn_id, ConnectionHandle {
            conn_id,
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            sender,
        });
    }

    /// Tear a connection down: drop the registry binding (unless a newer
    /// login already replaced it) and leave every joined room. Returns the
    /// rooms left so the caller can notify remaining members.
    pub fn deregister(&self, conn_id: ConnectionId, user_id: &str) -> Vec<String> {
        self.registry.unbind(user_id, conn_id);
        let rooms = self.rooms.drop_connection(conn_id);
        self.connections.remove(&conn_id);
        rooms
    }

    /// Returns `true` on first join; re-joins are idempotent.
    pub fn join_room(&self, conn_id: ConnectionId, room: &str) -> bool {
        self.rooms.join(conn_id, room)
    }

    /// Returns `true` when the connection was actually a member.
    pub fn leave_room(&self, conn_id: ConnectionId, room: &str) -> bool {
        self.rooms.leave(conn_id, room)
    }

    /// Number of connections currently joined to a room.
    pub fn count_connections(&self, room: &str) -> usize {
        self.rooms.count(room)
    }

    /// Total live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ── Fan-out ──────────────────────────────────────────────────────────

    /// Deliver an event to every member of a room.
    pub fn broadcast(&self, room: &str, event: &ServerEvent) {
        self.broadcast_inner(room, None, event);
    }

    /// Deliver an event to every member of a room except one connection
    /// (typically the sender).
    pub fn broadcast_except(&self, room: &str, except: ConnectionId, event: &ServerEvent) {
        self.broadcast_inner(room, Some(except), event);
    }

    fn broadcast_inner(&self, room: &str, except: Option<ConnectionId>, event: &ServerEvent) {
        let Ok(frame) = serde_json::to_string(event) else {
            warn!(room, "dropping unserializable event");
            return;
        };
        for member in self.rooms.members(room) {
            if Some(member) == except {
                continue;
            }
            if let Some(handle) = self.connections.get(&member)
                && !handle.send(&frame)
            {
                debug!(?member, room, "send to closed connection dropped");
            }
        }
    }

    /// Deliver an event to a user's current connection. A user who is not
    /// connected is a silent no-op, not an error.
    pub fn send_to_user(&self, user_id: &str, event: &ServerEvent) {
        let Some(conn_id) = self.registry.get(user_id) else {
            debug!(user_id, "send_to_user: not connected");
            return;
        };
        let Ok(frame) = serde_json::to_string(event) else {
            warn!(user_id, "dropping unserializable event");
            return;
        };
        if let Some(handle) = self.connections.get(&conn_id) {
            handle.send(&frame);
        }
    }
}

#[async_trait]
impl RoomFanout for RealtimeHub {
    async fn send_to_room(&self, room: &str, event: ServerEvent) {
        self.broadcast(room, &event);
    }
}
