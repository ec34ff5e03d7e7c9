//! In-memory connection bookkeeping for the realtime gateway.
//!
//! Two indices, both process-local and safe under concurrent mutation:
//! - [`ConnectionRegistry`]: user id → newest live connection.
//! - [`RoomMultiplexer`]: room id ↔ member connections.
//!
//! Neither structure persists anything; membership exists only while
//! connections are live.

use std::collections::HashSet;

use {dashmap::DashMap, uuid::Uuid};

/// Transport-level identifier, unique per live connection.
pub type ConnectionId = Uuid;

// ── Connection registry ──────────────────────────────────────────────────────

/// Maps each user to their most recent connection. A second login from the
/// same user replaces the entry, so only the newest connection receives
/// user-targeted sends.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_user: DashMap<String, ConnectionId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a user to a connection, returning the connection this login
    /// displaced, if any.
    pub fn bind(&self, user_id: &str, conn_id: ConnectionId) -> Option<ConnectionId> {
        self.by_user.insert(user_id.to_string(), conn_id)
    }

    /// Remove the binding, but only if it still points at `conn_id`. A stale
    /// disconnect from a displaced connection must not evict a newer login.
    pub fn unbind(&self, user_id: &str, conn_id: ConnectionId) -> bool {
        self.by_user
            .remove_if(user_id, |_, bound| *bound == conn_id)
            .is_some()
    }

    /// The connection currently bound to a user, if they are connected.
    pub fn get(&self, user_id: &str) -> Option<ConnectionId> {
        self.by_user.get(user_id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

// ── Room multiplexer ─────────────────────────────────────────────────────────

/// Groups live connections into named rooms and answers membership queries.
/// All operations are O(1) or O(room size).
#[derive(Debug, Default)]
pub struct RoomMultiplexer {
    members: DashMap<String, HashSet<ConnectionId>>,
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl RoomMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns `true` on first join; re-joining
    /// a room the connection already belongs to is idempotent.
    pub fn join(&self, conn_id: ConnectionId, room: &str) -> bool {
        let newly_joined = self
            .members
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
        self.joined
            .entry(conn_id)
            .or_default()
            .insert(room.to_string());
        newly_joined
    }

    /// Remove a connection from a room. Leaving a room never joined is a
    /// no-op; returns whether the connection was actually a member.
    pub fn leave(&self, conn_id: ConnectionId, room: &str) -> bool {
        let was_member = match self.members.get_mut(room) {
            Some(mut set) => set.remove(&conn_id),
            None => false,
        };
        self.members.remove_if(room, |_, set| set.is_empty());
        if let Some(mut rooms) = self.joined.get_mut(&conn_id) {
            rooms.remove(room);
        }
        self.joined.remove_if(&conn_id, |_, rooms| rooms.is_empty());
        was_member
    }

    /// Remove a connection from every room it had joined, returning those
    /// rooms so the caller can notify remaining members.
    pub fn drop_connection(&self, conn_id: ConnectionId) -> Vec<String> {
        let Some((_, rooms)) = self.joined.remove(&conn_id) else {
            return Vec::new();
        };
        for room in &rooms {
            if let Some(mut set) = self.members.get_mut(room) {
                set.remove(&conn_id);
            }
            self.members.remove_if(room, |_, set| set.is_empty());
        }
        rooms.into_iter().collect()
    }

    /// Snapshot of the connections currently joined to a room.
    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.members
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of connections currently joined to a room.
    pub fn count(&self, room: &str) -> usize {
        self.members.get(room).map(|set| set.len()).unwrap_or(0)
    }

    /// Whether the connection is currently a member of the room.
    pub fn is_member(&self, conn_id: ConnectionId, room: &str) -> bool {
        self.members
            .get(room)
            .map(|set| set.contains(&conn_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionId {
        Uuid::new_v4()
    }

    #[test]
    fn registry_newest_connection_wins() {
        let registry = ConnectionRegistry::new();
        let first = conn();
        let second = conn();

        assert_eq!(registry.bind("u1", first), None);
        assert_eq!(registry.bind("u1", second), Some(first));
        assert_eq!(registry.get("u1"), Some(second));
    }

    #[test]
    fn registry_stale_unbind_keeps_newer_login() {
        let registry = ConnectionRegistry::new();
        let first = conn();
        let second = conn();
        registry.bind("u1", first);
        registry.bind("u1", second);

        // The displaced connection disconnects late.
        assert!(!registry.unbind("u1", first));
        assert_eq!(registry.get("u1"), Some(second));

        assert!(registry.unbind("u1", second));
        assert_eq!(registry.get("u1"), None);
    }

    #[test]
    fn join_increments_count_once() {
        let rooms = RoomMultiplexer::new();
        let a = conn();

        assert_eq!(rooms.count("general"), 0);
        assert!(rooms.join(a, "general"));
        assert_eq!(rooms.count("general"), 1);

        // Idempotent re-join.
        assert!(!rooms.join(a, "general"));
        assert_eq!(rooms.count("general"), 1);
    }

    #[test]
    fn leave_never_joined_is_noop() {
        let rooms = RoomMultiplexer::new();
        let a = conn();
        assert!(!rooms.leave(a, "general"));
        assert_eq!(rooms.count("general"), 0);
    }

    #[test]
    fn drop_connection_leaves_every_room() {
        let rooms = RoomMultiplexer::new();
        let a = conn();
        let b = conn();
        rooms.join(a, "general");
        rooms.join(a, "homework");
        rooms.join(b, "general");

        let mut left = rooms.drop_connection(a);
        left.sort();
        assert_eq!(left, vec!["general".to_string(), "homework".to_string()]);
        assert_eq!(rooms.count("general"), 1);
        assert_eq!(rooms.count("homework"), 0);
        assert!(rooms.is_member(b, "general"));
        assert!(!rooms.is_member(a, "general"));
    }

    #[test]
    fn members_snapshot_tracks_joins_and_leaves() {
        let rooms = RoomMultiplexer::new();
        let a = conn();
        let b = conn();
        rooms.join(a, "general");
        rooms.join(b, "general");

        let mut members = rooms.members("general");
        members.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);

        rooms.leave(b, "general");
        assert_eq!(rooms.members("general"), vec![a]);
    }
}
