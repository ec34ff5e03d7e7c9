//! Configuration schema and loading for the studyhall gateway.

pub mod loader;
pub mod schema;

pub use {
    loader::{clear_config_dir, discover_and_load, load_config, set_config_dir},
    schema::{AuthConfig, DatabaseConfig, GatewayConfig, StudyhallConfig, TokenIdentity},
};
