use crate::error::config::ConfigError;

use common::ErrorLocation;
use models::{CoinType, FirmwareVersion};

use std::panic::Location;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const FIRMWARE_FILE_NAME: &str = "firmware.toml";
const BUNDLED_FIRMWARE_TOML: &str = include_str!("../../data/firmware.toml");

// ============================================
// FIRMWARE CONFIG STRUCTS
// ============================================

/// One `[[supported_firmware]]` entry.
///
/// A rule selects calls by the first selector it carries, in this order:
/// `coin_type`, `coin`, `methods`. `excluded_methods` then removes verbs from
/// the selection. `min`/`max` are `[generation 1, generation 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_type: Option<CoinType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coin: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<[FirmwareVersion; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<[FirmwareVersion; 2]>,
}

impl FirmwareRule {
    /// Whether this rule applies to `method` called for a coin of
    /// `coin_type` with the given lowercase `shortcut`.
    pub fn matches(&self, method: &str, coin_type: Option<CoinType>, shortcut: Option<&str>) -> bool {
        let selected = if let Some(rule_type) = self.coin_type {
            coin_type == Some(rule_type)
        } else if !self.coin.is_empty() {
            shortcut.is_some_and(|s| self.coin.iter().any(|c| c.eq_ignore_ascii_case(s)))
        } else if !self.methods.is_empty() {
            self.methods.iter().any(|m| m == method)
        } else {
            false
        };

        selected && !self.excluded_methods.iter().any(|m| m == method)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    #[serde(default)]
    pub supported_firmware: Vec<FirmwareRule>,
}

// ============================================
// IMPLEMENTATION
// ============================================

impl FirmwareConfig {
    /// Rules compiled into the binary.
    #[track_caller]
    pub fn bundled() -> Result<Self, ConfigError> {
        let config: FirmwareConfig =
            toml::from_str(BUNDLED_FIRMWARE_TOML).map_err(|e| ConfigError::BundledTable {
                location: ErrorLocation::from(Location::caller()),
                table: FIRMWARE_FILE_NAME,
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `firmware.toml` from `config_dir`, falling back to the bundled
    /// rules when the file is absent or unusable.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(FIRMWARE_FILE_NAME);

        if path.exists() {
            match Self::load_from_path(&path) {
                Ok(config) => {
                    info!("Firmware config loaded from {}", path.display());
                    return Ok(config);
                }
                Err(e) => {
                    warn!("Failed to load firmware config from {}: {}", path.display(), e);
                }
            }
        }

        info!("Using bundled firmware config");
        Self::bundled()
    }

    /// Load from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: FirmwareConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, rule) in self.supported_firmware.iter().enumerate() {
            if rule.coin_type.is_none() && rule.coin.is_empty() && rule.methods.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Firmware rule #{index} has no coin_type, coin or methods"),
                });
            }

            if rule.min.is_none() && rule.max.is_none() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Firmware rule #{index} has neither min nor max"),
                });
            }
        }

        Ok(())
    }

    /// Rules applying to a call, in file order.
    pub fn rules_for<'a>(
        &'a self,
        method: &'a str,
        coin_type: Option<CoinType>,
        shortcut: Option<&'a str>,
    ) -> impl Iterator<Item = &'a FirmwareRule> + 'a {
        self.supported_firmware
            .iter()
            .filter(move |rule| rule.matches(method, coin_type, shortcut))
    }
}
