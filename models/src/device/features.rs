use crate::FirmwareVersion;

use serde::{Deserialize, Serialize};

/// Hardware generation as reported by the `model` feature field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceModel {
    /// First generation ("1"), firmware major version 1.
    #[serde(rename = "1")]
    One,
    /// Second generation ("T"), firmware major version 2.
    #[serde(rename = "T")]
    T,
}

impl DeviceModel {
    pub fn major_version(&self) -> u32 {
        match self {
            DeviceModel::One => 1,
            DeviceModel::T => 2,
        }
    }
}

/// Snapshot of the `Features` message a device reported on acquire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeatures {
    pub vendor: String,
    pub model: DeviceModel,
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
    pub device_id: Option<String>,
    pub label: Option<String>,
    pub bootloader_mode: bool,
    /// Only reported in bootloader mode. `Some(false)` means a wiped device.
    pub firmware_present: Option<bool>,
    pub initialized: bool,
    pub passphrase_protection: bool,
}

impl DeviceFeatures {
    pub fn firmware_version(&self) -> FirmwareVersion {
        FirmwareVersion::new(
            self.major_version as u64,
            self.minor_version as u64,
            self.patch_version as u64,
        )
    }
}
