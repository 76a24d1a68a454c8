//! Configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "TEMU_AUDIO_CONFIG";

/// Resolve the configuration file path in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (`<config_dir>/temu/audio.toml`), if it exists
///
/// Returns `None` when no file applies and built-in defaults should be used.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform default location
    let default_path = default_config_path()?;
    if default_path.exists() {
        Some(default_path)
    } else {
        debug!("No config file at {}", default_path.display());
        None
    }
}

/// Platform default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("temu").join("audio.toml"))
}

/// Load a TOML configuration file into `T`.
///
/// An explicitly named file that does not exist is an error; callers that
/// want defaults should not resolve a path at all.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config = toml::from_str::<T>(&content).map_err(|e| {
        Error::Config(format!("Invalid config file {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve and load a configuration, falling back to `T::default()` when no
/// configuration file applies.
pub fn load_or_default<T: DeserializeOwned + Default>(cli_arg: Option<&Path>) -> Result<T> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => load_toml(&path),
        None => {
            info!("No configuration file found, using built-in defaults");
            Ok(T::default())
        }
    }
}
