pub mod firmware;

pub use firmware::{FirmwareConfig, FirmwareRule};

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

const SETTINGS_FILE_NAME: &str = "settings.json";
const SETTINGS_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "trezor-connect";

// ============================================
// SETTINGS STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcSettings {
    #[serde(default = "default_ipc_port")]
    pub port: u16,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            port: default_ipc_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Origin of the embedding application, used to build login identities.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Trusted hosts skip the permission prompt.
    #[serde(default)]
    pub trusted_host: bool,

    #[serde(default = "default_typed_call_timeout_secs")]
    pub typed_call_timeout_secs: u64,

    #[serde(default)]
    pub ipc: IpcSettings,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            origin: default_origin(),
            trusted_host: false,
            typed_call_timeout_secs: default_typed_call_timeout_secs(),
            ipc: IpcSettings::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    SETTINGS_VERSION
}
fn default_origin() -> String {
    "http://localhost".to_string()
}
fn default_typed_call_timeout_secs() -> u64 {
    120
}
fn default_ipc_port() -> u16 {
    21335
}

// ============================================
// IMPLEMENTATION
// ============================================

/// `{platform config dir}/trezor-connect`.
#[track_caller]
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| ConfigError::DirectoryNotFound {
            location: ErrorLocation::from(Location::caller()),
            reason: "Platform has no config directory".to_string(),
        })
}

impl ConnectSettings {
    /// Load settings from `{config_dir}/settings.json`.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read,
    /// parsed or validated is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let settings_path = config_dir.join(SETTINGS_FILE_NAME);

        if !settings_path.exists() {
            info!(
                "Settings file not found at {}, using defaults",
                settings_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
            warn!("Failed to read settings file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: settings_path.clone(),
                source: e,
            }
        })?;

        let settings: ConnectSettings = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse settings JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: settings_path.clone(),
                reason: e.to_string(),
            }
        })?;

        settings.validate()?;

        info!("Settings loaded from {}", settings_path.display());
        Ok(settings)
    }

    /// Save settings to `{config_dir}/settings.json` (temp file + rename).
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let settings_path = config_dir.join(SETTINGS_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", SETTINGS_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &settings_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: settings_path.clone(),
            source: e,
        })?;

        info!("Settings saved to {}", settings_path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > SETTINGS_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, SETTINGS_VERSION
                ),
            });
        }

        if !self.origin.starts_with("http://")
            && !self.origin.starts_with("https://")
            && !self.origin.starts_with("file://")
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid origin format: {}", self.origin),
            });
        }

        if self.typed_call_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "typed_call_timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
