//! Firmware version with the `"0"` sentinel used by firmware tables.

use crate::{ErrorLocation, ModelError};

use std::cmp::Ordering;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const ZERO_SENTINEL: &str = "0";

/// A `major.minor.patch` firmware version.
///
/// `0.0.0` doubles as the `"0"` sentinel of firmware tables and is rendered
/// back as `"0"`. What the sentinel means depends on where it sits in a
/// [`FirmwareBounds`](crate::FirmwareBounds).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FirmwareVersion(Version);

impl FirmwareVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.major == 0 && self.0.minor == 0 && self.0.patch == 0
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    /// Parse `"0"`, `"2"`, `"2.4"` or `"2.4.3"`; missing components are zero.
    #[track_caller]
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let trimmed = input.trim();
        if trimmed == ZERO_SENTINEL {
            return Ok(Self::zero());
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(ModelError::VersionParse {
                message: format!("Invalid firmware version '{input}'"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut padded = parts.clone();
        padded.resize(3, "0");

        Version::parse(&padded.join("."))
            .map(Self)
            .map_err(|e| ModelError::VersionParse {
                message: format!("Invalid firmware version '{input}': {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

impl Default for FirmwareVersion {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl FromStr for FirmwareVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "{ZERO_SENTINEL}")
        } else {
            write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
        }
    }
}

impl Serialize for FirmwareVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FirmwareVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
