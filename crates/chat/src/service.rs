use std::sync::Arc;

use {
    chrono::{Duration, Utc},
    tracing::{debug, info},
    uuid::Uuid,
};

use studyhall_protocol::{ACTIVE_WINDOW_SECS, GENERAL_ROOM, MAX_MESSAGE_LEN, ServerEvent};

use crate::{
    directory::UserDirectory,
    error::ChatError,
    fanout::RoomFanout,
    model::{ActiveUser, Message, MessagePage, Pagination},
    store::MessageStore,
};

/// The authoritative chat operations behind the HTTP façade. Persists before
/// notifying; a failed persist never reaches connected clients.
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    fanout: Arc<dyn RoomFanout>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        fanout: Arc<dyn RoomFanout>,
    ) -> Self {
        Self {
            store,
            directory,
            fanout,
        }
    }

    /// Paginated room history. Page 1 holds the newest `limit` messages,
    /// rendered oldest-first; `total` counts the whole room.
    pub async fn get_messages(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage, ChatError> {
        let page = page.max(1);
        let limit = limit.max(1);

        let messages = self.store.page(room, page, limit).await?;
        let total = self.store.count(room).await?;

        Ok(MessagePage {
            messages,
            pagination: Pagination { page, limit, total },
        })
    }

    /// Validate, persist, then fan the durable envelope out to the room.
    pub async fn send_message(
        &self,
        user_id: &str,
        text: &str,
        room: Option<&str>,
    ) -> Result<Message, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::validation("message text is required"));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(ChatError::validation("message too long"));
        }

        let user = self
            .directory
            .find(user_id)
            .await?
            .ok_or(ChatError::Unauthorized)?;

        let room = room.unwrap_or(GENERAL_ROOM);
        let message = Message {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            author_id: user.id,
            author_name: user.name,
            room: room.to_string(),
            created_at: Utc::now(),
        };

        self.store.insert(&message).await?;
        info!(message_id = %message.id, room, "message persisted");

        self.fanout
            .send_to_room(room, ServerEvent::NewMessage(message.envelope()))
            .await;

        Ok(message)
    }

    /// Distinct authors with a persisted message in the room over the last
    /// 24 hours. Durable-history presence; live connection counts live on
    /// the gateway.
    pub async fn recently_active_users(&self, room: &str) -> Result<Vec<ActiveUser>, ChatError> {
        let cutoff = Utc::now() - Duration::seconds(ACTIVE_WINDOW_SECS);
        let author_ids = self.store.distinct_authors_since(room, cutoff).await?;

        let mut users = Vec::with_capacity(author_ids.len());
        for id in author_ids {
            match self.directory.find(&id).await? {
                Some(profile) => users.push(ActiveUser {
                    id: profile.id,
                    name: profile.name,
                    email: profile.email,
                    status: "online",
                }),
                None => debug!(user_id = %id, "active author missing from directory"),
            }
        }
        Ok(users)
    }

    /// Delete a message the caller owns. Missing and not-owned both map to
    /// `NotFound`.
    pub async fn delete_message(&self, user_id: &str, message_id: &str) -> Result<(), ChatError> {
        if Uuid::parse_str(message_id).is_err() {
            return Err(ChatError::validation("invalid message id"));
        }

        if self.store.delete_owned(message_id, user_id).await? {
            info!(message_id, "message deleted");
            Ok(())
        } else {
            Err(ChatError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use async_trait::async_trait;

    use {
        super::*,
        crate::{
            directory::{InMemoryUserDirectory, UserProfile},
            store::SqliteMessageStore,
        },
        studyhall_protocol::MessageOrigin,
    };

    /// Records every fan-out instead of delivering it.
    #[derive(Default)]
    struct RecordingFanout {
        events: Mutex<Vec<(String, ServerEvent)>>,
    }

    impl RecordingFanout {
        fn take(&self) -> Vec<(String, ServerEvent)> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    #[async_trait]
    impl RoomFanout for RecordingFanout {
        async fn send_to_room(&self, room: &str, event: ServerEvent) {
            self.events
                .lock()
                .unwrap()
                .push((room.to_string(), event));
        }
    }

    fn directory() -> InMemoryUserDirectory {
        InMemoryUserDirectory::new()
            .with_user(UserProfile {
                id: "alice".into(),
                name: "Alice".into(),
                email: "alice@school.test".into(),
            })
            .with_user(UserProfile {
                id: "bob".into(),
                name: "Bob".into(),
                email: "bob@school.test".into(),
            })
    }

    async fn service() -> (ChatService, Arc<RecordingFanout>) {
        let store = Arc::new(SqliteMessageStore::open_in_memory().await.unwrap());
        let fanout = Arc::new(RecordingFanout::default());
        let service = ChatService::new(store, Arc::new(directory()), Arc::clone(&fanout) as _);
        (service, fanout)
    }

    #[tokio::test]
    async fn send_persists_once_and_fans_out_durable_id() {
        let (service, fanout) = service().await;

        let message = service
            .send_message("alice", "  hello  ", None)
            .await
            .unwrap();
        assert_eq!(message.text, "hello");
        assert_eq!(message.author_id, "alice");
        assert_eq!(message.author_name, "Alice");
        assert_eq!(message.room, GENERAL_ROOM);

        let events = fanout.take();
        assert_eq!(events.len(), 1);
        let (room, ServerEvent::NewMessage(envelope)) = &events[0] else {
            panic!("expected new_message fan-out");
        };
        assert_eq!(room, GENERAL_ROOM);
        assert_eq!(envelope.id, message.id);
        assert_eq!(envelope.origin, MessageOrigin::Durable);

        let page = service.get_messages(GENERAL_ROOM, 1, 50).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn send_rejects_blank_and_overlong_text() {
        let (service, fanout) = service().await;

        let err = service.send_message("alice", "   ", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        let err = service.send_message("alice", &long, None).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        // Exactly at the limit is fine.
        let exact = "y".repeat(MAX_MESSAGE_LEN);
        service.send_message("alice", &exact, None).await.unwrap();

        assert_eq!(fanout.take().len(), 1);
        let page = service.get_messages(GENERAL_ROOM, 1, 10).await.unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    /// Store whose writes always fail, as if the database were down.
    struct OfflineStore;

    #[async_trait]
    impl MessageStore for OfflineStore {
        async fn insert(&self, _message: &Message) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("store offline"))
        }

        async fn page(&self, _room: &str, _page: u32, _limit: u32) -> anyhow::Result<Vec<Message>> {
            Err(anyhow::anyhow!("store offline"))
        }

        async fn count(&self, _room: &str) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("store offline"))
        }

        async fn distinct_authors_since(
            &self,
            _room: &str,
            _cutoff: chrono::DateTime<Utc>,
        ) -> anyhow::Result<Vec<String>> {
            Err(anyhow::anyhow!("store offline"))
        }

        async fn delete_owned(&self, _id: &str, _author_id: &str) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("store offline"))
        }

        async fn get(&self, _id: &str) -> anyhow::Result<Option<Message>> {
            Err(anyhow::anyhow!("store offline"))
        }
    }

    #[tokio::test]
    async fn failed_persist_suppresses_fanout() {
        let fanout = Arc::new(RecordingFanout::default());
        let service = ChatService::new(
            Arc::new(OfflineStore),
            Arc::new(directory()),
            Arc::clone(&fanout) as _,
        );

        let err = service
            .send_message("alice", "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Persistence(_)));

        // No phantom message reaches live clients.
        assert!(fanout.take().is_empty());
    }

    #[tokio::test]
    async fn send_from_unknown_user_is_unauthorized() {
        let (service, fanout) = service().await;

        let err = service
            .send_message("stranger", "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized));
        assert!(fanout.take().is_empty());
    }

    #[tokio::test]
    async fn pagination_total_is_independent_of_page() {
        let (service, _) = service().await;
        for i in 0..7 {
            service
                .send_message("alice", &format!("msg {i}"), Some("math"))
                .await
                .unwrap();
        }

        let page = service.get_messages("math", 1, 3).await.unwrap();
        assert_eq!(page.messages.len(), 3);
        assert_eq!(page.pagination.total, 7);
        // Newest three, oldest-first.
        let texts: Vec<_> = page.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 4", "msg 5", "msg 6"]);

        // Non-positive inputs clamp instead of crashing.
        let page = service.get_messages("math", 0, 0).await.unwrap();
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, 1);
        assert_eq!(page.messages.len(), 1);
    }

    #[tokio::test]
    async fn recently_active_users_reports_authors_in_window() {
        let (service, _) = service().await;
        service
            .send_message("alice", "hello", Some("general"))
            .await
            .unwrap();
        service
            .send_message("bob", "hi", Some("math"))
            .await
            .unwrap();

        let users = service.recently_active_users("general").await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "alice");
        assert_eq!(users[0].status, "online");

        assert!(service.recently_active_users("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_requires_ownership_and_keeps_message_otherwise() {
        let (service, _) = service().await;
        let message = service
            .send_message("bob", "mine", Some("general"))
            .await
            .unwrap();

        let err = service
            .delete_message("alice", &message.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));

        // Still retrievable after the failed delete.
        let page = service.get_messages("general", 1, 10).await.unwrap();
        assert!(page.messages.iter().any(|m| m.id == message.id));

        service.delete_message("bob", &message.id).await.unwrap();
        let err = service
            .delete_message("bob", &message.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
    }

    #[tokio::test]
    async fn delete_rejects_malformed_id() {
        let (service, _) = service().await;
        let err = service
            .delete_message("alice", "not-a-uuid")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }
}
