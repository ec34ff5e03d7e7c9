/// The user directory is an external collaborator: the chat subsystem only
/// resolves ids to profiles, it never creates or mutates users.
use std::collections::HashMap;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>>;
}

/// Directory backed by a fixed map, used for wiring and tests.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, UserProfile>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, profile: UserProfile) -> Self {
        self.users.insert(profile.id.clone(), profile);
        self
    }

    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.users.get(user_id).cloned())
    }
}
