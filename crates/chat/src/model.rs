use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use studyhall_protocol::{MessageEnvelope, MessageOrigin};

/// A persisted chat message. Immutable once stored except for deletion by
/// the original author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    #[serde(rename = "userId")]
    pub author_id: String,
    /// Display name snapshotted at send time; not re-synced on rename.
    #[serde(rename = "username")]
    pub author_name: String,
    #[serde(rename = "chatRoom")]
    pub room: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The durable-path `new_message` payload for this message.
    pub fn envelope(&self) -> MessageEnvelope {
        MessageEnvelope {
            id: self.id.clone(),
            text: self.text.clone(),
            user_id: self.author_id.clone(),
            username: self.author_name.clone(),
            chat_room: self.room.clone(),
            timestamp: self.created_at,
            origin: MessageOrigin::Durable,
        }
    }
}

/// One page of room history.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

/// A user with persisted messages in the recent-activity window. The status
/// marker is static; live connection state is a separate query on the
/// gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: &'static str,
}
