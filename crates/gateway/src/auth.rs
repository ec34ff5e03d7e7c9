use std::{collections::HashMap, sync::Arc};

use {async_trait::async_trait, tracing::warn};

use studyhall_config::AuthConfig;

// ── Types ────────────────────────────────────────────────────────────────────

/// Who a verified credential belongs to. Fixed for the connection lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,
    #[error("invalid credential")]
    Invalid,
    #[error("authentication timed out")]
    Timeout,
}

/// Pluggable connection authentication. Verification may involve external
/// calls, so implementations are async; the gateway bounds them with the
/// auth timeout on [`crate::state::GatewayState`].
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

// ── Verifiers ────────────────────────────────────────────────────────────────

/// Verifies tokens against a fixed table. Every entry is compared so the
/// timing does not reveal which tokens exist.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut matched = None;
        for (expected, identity) in &self.tokens {
            if safe_equal(token, expected) {
                matched = Some(identity.clone());
            }
        }
        matched.ok_or(AuthError::Invalid)
    }
}

/// Accepts any non-empty token and uses it as the identity. Only reachable
/// through the explicit `allow_insecure` config flag; never a default.
#[derive(Debug, Default)]
pub struct InsecureVerifier;

#[async_trait]
impl TokenVerifier for InsecureVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        Ok(Identity {
            user_id: token.to_string(),
            display_name: token.to_string(),
        })
    }
}

/// Build the verifier the config asks for.
pub fn verifier_from_config(auth: &AuthConfig) -> Arc<dyn TokenVerifier> {
    if auth.allow_insecure {
        warn!("insecure auth enabled: every connection will be accepted");
        return Arc::new(InsecureVerifier);
    }
    if auth.tokens.is_empty() {
        warn!("no auth tokens configured: every connection will be rejected");
    }
    let tokens = auth
        .tokens
        .iter()
        .map(|(token, id)| {
            (token.clone(), Identity {
                user_id: id.user_id.clone(),
                display_name: id.display_name.clone(),
            })
        })
        .collect();
    Arc::new(StaticTokenVerifier::new(tokens))
}
