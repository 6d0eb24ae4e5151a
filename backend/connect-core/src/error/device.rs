//! Errors raised by the device transport collaborator.

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DeviceError {
    #[error("Device Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Disconnected Error: {message} {location}")]
    Disconnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },
}

impl DeviceError {
    pub fn message(&self) -> &str {
        match self {
            DeviceError::Timeout { message, .. }
            | DeviceError::Disconnected { message, .. }
            | DeviceError::Transport { message, .. } => message,
        }
    }
}
