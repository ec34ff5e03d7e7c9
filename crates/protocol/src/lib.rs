//! Wire types shared between the realtime gateway, the chat services, and
//! clients: inbound client events, outbound server events, and the message
//! envelope both send paths emit.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Room used when a message does not name one.
pub const GENERAL_ROOM: &str = "general";

/// Maximum message length in characters, counted after trimming.
pub const MAX_MESSAGE_LEN: usize = 1000;

/// A connection that has not authenticated within this window is closed.
pub const AUTH_TIMEOUT_MS: u64 = 5_000;

/// Window for the "recently active" author query.
pub const ACTIVE_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Default page size for history retrieval.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

// ── Inbound (client → gateway) ───────────────────────────────────────────────

/// Events a connected client may send over the realtime transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    LeaveRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    SendMessage {
        text: String,
        #[serde(rename = "chatRoom")]
        chat_room: String,
    },
    TypingStart {
        #[serde(rename = "chatRoom")]
        chat_room: String,
    },
    TypingStop {
        #[serde(rename = "chatRoom")]
        chat_room: String,
    },
}

// ── Outbound (gateway → client) ──────────────────────────────────────────────

/// Where a `new_message` envelope came from.
///
/// `Transient` envelopes are the live preview path: a locally generated id,
/// never persisted. `Durable` envelopes carry the store-assigned id and are
/// emitted only after a successful persist; clients deduplicate on that id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    Durable,
    Transient,
}

/// The `new_message` payload shared by both send paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub username: String,
    pub chat_room: String,
    pub timestamp: DateTime<Utc>,
    pub origin: MessageOrigin,
}

/// Events the gateway emits to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    UserJoined {
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
        message: String,
    },
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
        message: String,
    },
    NewMessage(MessageEnvelope),
    UserTyping {
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
    },
    UserStoppedTyping {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl ServerEvent {
    pub fn user_joined(user_id: &str, username: &str) -> Self {
        Self::UserJoined {
            user_id: user_id.to_string(),
            username: username.to_string(),
            message: format!("{username} joined the chat"),
        }
    }

    pub fn user_left(user_id: &str, username: &str) -> Self {
        Self::UserLeft {
            user_id: user_id.to_string(),
            username: username.to_string(),
            message: format!("{username} left the chat"),
        }
    }
}
