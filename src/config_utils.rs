//! Configuration file utilities
//!
//! Helpers for locating and reading the relay's files. Config lives in the
//! platform-specific config directory under "review-relay/", logs and run
//! reports under "~/.review-relay/logs".

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "review-relay";

/// Name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Get the app's config directory path.
///
/// Returns: `~/.config/review-relay` (Linux)
///          `~/Library/Application Support/review-relay` (macOS)
///          `C:\Users\<User>\AppData\Roaming\review-relay` (Windows)
pub fn get_config_dir() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or("Could not find config directory")?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Get the directory where log files and run reports are written.
///
/// Returns: `~/.review-relay/logs`
pub fn get_logs_dir() -> Result<PathBuf, String> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| "Could not find home directory".to_string())?;
    Ok(home_dir.join(format!(".{}", APP_DIR_NAME)).join("logs"))
}

/// Get the full path to a config file.
pub fn config_file_path(filename: &str) -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join(filename))
}

/// Ensure a directory exists, creating parents as needed.
pub fn ensure_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))
}

/// Load JSON data from an explicit path.
///
/// # Returns
/// * `Ok(Some(data))` if file exists and was parsed successfully
/// * `Ok(None)` if file doesn't exist
/// * `Err(...)` if file exists but couldn't be read/parsed
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let data = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    Ok(Some(data))
}

/// Load data from a file in the config directory.
pub fn load_config_file<T: DeserializeOwned>(filename: &str) -> Result<Option<T>, String> {
    let config_file = config_file_path(filename)?;
    load_json_file(&config_file)
}
