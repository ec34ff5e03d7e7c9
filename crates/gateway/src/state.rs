use std::{sync::Arc, time::Duration};

use {studyhall_chat::ChatService, studyhall_protocol::AUTH_TIMEOUT_MS};

use crate::{auth::TokenVerifier, hub::RealtimeHub};

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    /// Live connections, registry, and room indices.
    pub hub: Arc<RealtimeHub>,
    /// Durable chat operations (HTTP façade).
    pub chat: Arc<ChatService>,
    /// Connection/request authentication.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Bound on connection-open authentication; a verifier that has not
    /// answered by then gets the connection closed.
    pub auth_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(
        hub: Arc<RealtimeHub>,
        chat: Arc<ChatService>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Arc<Self> {
        Self::with_auth_timeout(hub, chat, verifier, Duration::from_millis(AUTH_TIMEOUT_MS))
    }

    /// Like [`GatewayState::new`] with a custom authentication bound; tests
    /// shrink it to exercise the timeout path.
    pub fn with_auth_timeout(
        hub: Arc<RealtimeHub>,
        chat: Arc<ChatService>,
        verifier: Arc<dyn TokenVerifier>,
        auth_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            hub,
            chat,
            verifier,
            auth_timeout,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
