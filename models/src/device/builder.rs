use crate::error::model_error::ModelError;
use crate::{DeviceFeatures, DeviceModel, ErrorLocation};

use std::panic::Location;

const DEFAULT_VENDOR: &str = "trezor.io";

/// Builder for creating validated DeviceFeatures instances.
///
/// Device transports hand over loosely-typed feature maps; the builder
/// enforces the invariants the dispatcher relies on (known generation,
/// major version consistent with the model).
#[derive(Debug, Default)]
pub struct FeaturesBuilder {
    vendor: Option<String>,
    model: Option<DeviceModel>,
    version: Option<(u32, u32, u32)>,
    device_id: Option<String>,
    label: Option<String>,
    bootloader_mode: bool,
    firmware_present: Option<bool>,
    initialized: Option<bool>,
    passphrase_protection: bool,
}

impl FeaturesBuilder {
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_model(mut self, model: DeviceModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.version = Some((major, minor, patch));
        self
    }

    pub fn with_device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bootloader_mode(mut self, bootloader_mode: bool) -> Self {
        self.bootloader_mode = bootloader_mode;
        self
    }

    pub fn with_firmware_present(mut self, present: bool) -> Self {
        self.firmware_present = Some(present);
        self
    }

    pub fn with_initialized(mut self, initialized: bool) -> Self {
        self.initialized = Some(initialized);
        self
    }

    pub fn with_passphrase_protection(mut self, enabled: bool) -> Self {
        self.passphrase_protection = enabled;
        self
    }

    /// Build the DeviceFeatures with validation.
    #[track_caller]
    pub fn build(self) -> Result<DeviceFeatures, ModelError> {
        let model = self.model.ok_or_else(|| ModelError::Validation {
            message: String::from("Device model is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let (major, minor, patch) = self.version.ok_or_else(|| ModelError::Validation {
            message: String::from("Firmware version is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if major != model.major_version() {
            return Err(ModelError::Validation {
                message: format!(
                    "Major version {major} does not match model {:?} (expected {})",
                    model,
                    model.major_version()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !self.bootloader_mode && self.firmware_present.is_some() {
            return Err(ModelError::Validation {
                message: String::from("firmware_present is only reported in bootloader mode"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(DeviceFeatures {
            vendor: self.vendor.unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
            model,
            major_version: major,
            minor_version: minor,
            patch_version: patch,
            device_id: self.device_id,
            label: self.label,
            bootloader_mode: self.bootloader_mode,
            firmware_present: self.firmware_present,
            initialized: self.initialized.unwrap_or(true),
            passphrase_protection: self.passphrase_protection,
        })
    }
}
