//! TOML settings file I/O
//!
//! Handles loading and saving supervisor settings to/from TOML files
//! in the user's configuration directory.

use crate::config::Settings;
use crate::error::{AdhocError, ConfigError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default settings file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/adhoc, or the ADHOC_CONFIG_DIR environment variable if set
pub fn get_config_dir() -> Result<PathBuf, AdhocError> {
    if let Ok(config_dir) = std::env::var("ADHOC_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        AdhocError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("adhoc"))
}

/// Get the default settings file path
pub fn get_config_path() -> Result<PathBuf, AdhocError> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the default TOML file
///
/// A missing file is not an error: the defaults are used.
pub fn load_settings() -> Result<Settings, AdhocError> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        debug!("No settings file at {:?}, using defaults", config_path);
        return Ok(Settings::default());
    }
    load_settings_from_path(&config_path)
}

/// Load settings from a specific TOML file
pub fn load_settings_from_path<P: AsRef<Path>>(path: P) -> Result<Settings, AdhocError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AdhocError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => AdhocError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let settings: Settings = toml::from_str(&contents)?;

    settings
        .validate()
        .map_err(|e| AdhocError::Config(ConfigError::ValidationError { message: e }))?;

    debug!(
        "Loaded settings from {:?}: data_dir={:?}, shell={:?}",
        path.as_ref(),
        settings.paths.data_dir,
        settings.shell.shell
    );

    Ok(settings)
}

/// Save settings to a specific TOML file
pub fn save_settings_to_path<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<(), AdhocError> {
    settings
        .validate()
        .map_err(|e| AdhocError::Config(ConfigError::ValidationError { message: e }))?;

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AdhocError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let toml_string = toml::to_string_pretty(settings)?;

    std::fs::write(&path, toml_string).map_err(|_e| {
        AdhocError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved settings to {:?}", path.as_ref());
    Ok(())
}
