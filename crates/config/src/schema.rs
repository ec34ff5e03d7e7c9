/// Config schema types (gateway, database, auth).
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyhallConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8085,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Sqlite file path for the message store.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "studyhall.db".into(),
        }
    }
}

/// Connection authentication.
///
/// Tokens are issued externally; the gateway only verifies them against this
/// table. `allow_insecure` is the explicit opt-in for the accept-everything
/// verifier — there is no default bypass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub allow_insecure: bool,
    /// token → identity it authenticates.
    pub tokens: HashMap<String, TokenIdentity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}
