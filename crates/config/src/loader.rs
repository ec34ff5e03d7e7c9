use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::schema::StudyhallConfig;

/// Standard config file name.
const CONFIG_FILENAME: &str = "studyhall.toml";

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory. Can be called multiple times (e.g. in tests) — each call
/// replaces the previous override.
pub fn set_config_dir(path: PathBuf) {
    if let Ok(mut dir) = CONFIG_DIR_OVERRIDE.lock() {
        *dir = Some(path);
    }
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    if let Ok(mut dir) = CONFIG_DIR_OVERRIDE.lock() {
        *dir = None;
    }
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().ok().and_then(|dir| dir.clone())
}

/// Load config from the given path.
pub fn load_config(path: &Path) -> anyhow::Result<StudyhallConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load `studyhall.toml` from the override dir or the current
/// directory. Falls back to defaults when no file exists; a file that exists
/// but fails to parse is reported and skipped.
pub fn discover_and_load() -> StudyhallConfig {
    let dir = config_dir_override()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let candidate = dir.join(CONFIG_FILENAME);

    if candidate.is_file() {
        match load_config(&candidate) {
            Ok(config) => {
                debug!(path = %candidate.display(), "loaded config");
                return config;
            },
            Err(e) => warn!(path = %candidate.display(), error = %e, "ignoring invalid config"),
        }
    }
    StudyhallConfig::default()
}
