pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{OperationSettings, PollSettings, Settings, TeardownSettings};

use std::path::{Path, PathBuf};

/// Environment variable pointing at a settings file directly
pub const CONFIG_PATH_ENV: &str = "RECLAIM_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "reclaim.local.yaml",
    ".reclaim.local.yaml",
    "reclaim.yaml",
    ".reclaim.yaml",
];

/// Per-user configuration directory (`~/.config/reclaim` on Linux)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("reclaim"))
}

/// Locate the settings file
///
/// Search order:
/// 1. `RECLAIM_CONFIG_PATH` (direct path)
/// 2. current directory: reclaim.local.yaml, .reclaim.local.yaml, reclaim.yaml, .reclaim.yaml
/// 3. the same names inside `./.reclaim/`
/// 4. `~/.config/reclaim/reclaim.yaml` (global settings)
pub fn find_settings_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {}, which does not exist",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".reclaim");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join("reclaim.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::SettingsFileNotFound)
}

/// Read and validate a settings file
pub fn load(path: &Path) -> Result<Settings> {
    tracing::debug!("Loading settings from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Settings::from_yaml(&content)
}

/// Find and load the settings file
pub fn load_settings() -> Result<Settings> {
    load(&find_settings_file()?)
}

/// Like [`load_settings`], falling back to defaults when no file exists
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_or_default() -> Result<Settings> {
    match load_settings() {
        Err(ConfigError::SettingsFileNotFound) => {
            tracing::debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
        other => other,
    }
}
