mod credentials;
mod settings;

pub use credentials::CredentialStore;
pub use settings::{
    validate_days, CollectConfig, Config, GarminConfig, InferenceConfig, InfluxConfig,
    ReportConfig, MAX_DAYS,
};

use crate::error::{RelayError, Result};
use std::path::PathBuf;

/// Configuration directory name for this tool
const CONFIG_DIR_NAME: &str = "garmin-relay";

/// Directory name garmin-cli stores its tokens under
const GARMIN_DATA_DIR_NAME: &str = "garmin";

/// Get the configuration directory path
/// Returns ~/.config/garmin-relay on Unix, ~/Library/Application Support/garmin-relay on macOS
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| RelayError::config("Could not determine config directory"))
}

/// Default path of the TOML configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the directory holding Garmin tokens written by `garmin auth login`
/// Returns ~/.local/share/garmin on Unix, ~/Library/Application Support/garmin on macOS
pub fn garmin_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(GARMIN_DATA_DIR_NAME))
        .ok_or_else(|| RelayError::config("Could not determine data directory"))
}
