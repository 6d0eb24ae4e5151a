//! Errors raised inside a method lifecycle or by the dispatcher's gating.
//!
//! Every variant maps to a stable wire code through [`ConnectError::code`].
//! The dispatcher turns any of them into an unsuccessful envelope; none of
//! them ever crosses the call boundary as a Rust error.

use crate::error::device::DeviceError;

use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

pub const CODE_INVALID_PARAMETER: &str = "Method_InvalidParameter";
pub const CODE_UNKNOWN_COIN: &str = "Method_UnknownCoin";
pub const CODE_NOT_ALLOWED: &str = "Method_NotAllowed";
pub const CODE_FIRMWARE_NOT_SUPPORTED: &str = "Method_FirmwareNotSupported";
pub const CODE_FIRMWARE_OUTDATED: &str = "Method_FirmwareOutdated";
pub const CODE_PERMISSIONS_NOT_GRANTED: &str = "Method_PermissionsNotGranted";
pub const CODE_ACTION_CANCELLED: &str = "Failure_ActionCancelled";
pub const CODE_RUNTIME: &str = "Runtime";
pub const CODE_DEVICE_INVALID_STATE: &str = "Device_InvalidState";
pub const CODE_DEVICE_NOT_INITIALIZED: &str = "Device_NotInitialized";
pub const CODE_DEVICE_CALL_IN_PROGRESS: &str = "Device_CallInProgress";
pub const CODE_DEVICE_NOT_FOUND: &str = "Device_NotFound";

#[derive(Debug, ThisError)]
pub enum ConnectError {
    #[error("Invalid Parameter Error: {message} {location}")]
    InvalidParameter {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Coin Error: {message} {location}")]
    UnknownCoin {
        message: String,
        location: ErrorLocation,
    },

    #[error("Method Not Allowed Error: {message} {location}")]
    MethodNotAllowed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Firmware Not Supported Error: {message} {location}")]
    FirmwareNotSupported {
        message: String,
        location: ErrorLocation,
    },

    #[error("Firmware Outdated Error: {message} {location}")]
    FirmwareOutdated {
        message: String,
        location: ErrorLocation,
    },

    #[error("Permissions Not Granted Error: {message} {location}")]
    PermissionsNotGranted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Action Cancelled Error: {message} {location}")]
    ActionCancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Invalid State Error: {message} {location}")]
    DeviceInvalidState {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Not Initialized Error: {message} {location}")]
    DeviceNotInitialized {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Call In Progress Error: {message} {location}")]
    DeviceCallInProgress {
        message: String,
        location: ErrorLocation,
    },

    #[error("Device Not Found Error: {message} {location}")]
    DeviceNotFound {
        message: String,
        location: ErrorLocation,
    },

    /// A `Failure` reply from the device whose code has no dedicated variant.
    #[error("Device Failure Error: {code}: {message} {location}")]
    DeviceFailure {
        code: String,
        message: String,
        location: ErrorLocation,
    },
}

impl ConnectError {
    #[track_caller]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        ConnectError::InvalidParameter {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn runtime(message: impl Into<String>) -> Self {
        ConnectError::Runtime {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn action_cancelled() -> Self {
        ConnectError::ActionCancelled {
            message: String::from("Cancelled"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Wire code placed in the envelope's `payload.code`.
    pub fn code(&self) -> &str {
        match self {
            ConnectError::InvalidParameter { .. } => CODE_INVALID_PARAMETER,
            ConnectError::UnknownCoin { .. } => CODE_UNKNOWN_COIN,
            ConnectError::MethodNotAllowed { .. } => CODE_NOT_ALLOWED,
            ConnectError::FirmwareNotSupported { .. } => CODE_FIRMWARE_NOT_SUPPORTED,
            ConnectError::FirmwareOutdated { .. } => CODE_FIRMWARE_OUTDATED,
            ConnectError::PermissionsNotGranted { .. } => CODE_PERMISSIONS_NOT_GRANTED,
            ConnectError::ActionCancelled { .. } => CODE_ACTION_CANCELLED,
            ConnectError::Runtime { .. } => CODE_RUNTIME,
            ConnectError::DeviceInvalidState { .. } => CODE_DEVICE_INVALID_STATE,
            ConnectError::DeviceNotInitialized { .. } => CODE_DEVICE_NOT_INITIALIZED,
            ConnectError::DeviceCallInProgress { .. } => CODE_DEVICE_CALL_IN_PROGRESS,
            ConnectError::DeviceNotFound { .. } => CODE_DEVICE_NOT_FOUND,
            ConnectError::DeviceFailure { code, .. } => code,
        }
    }

    /// Human-readable message without the source location.
    pub fn message(&self) -> &str {
        match self {
            ConnectError::InvalidParameter { message, .. }
            | ConnectError::UnknownCoin { message, .. }
            | ConnectError::MethodNotAllowed { message, .. }
            | ConnectError::FirmwareNotSupported { message, .. }
            | ConnectError::FirmwareOutdated { message, .. }
            | ConnectError::PermissionsNotGranted { message, .. }
            | ConnectError::ActionCancelled { message, .. }
            | ConnectError::Runtime { message, .. }
            | ConnectError::DeviceInvalidState { message, .. }
            | ConnectError::DeviceNotInitialized { message, .. }
            | ConnectError::DeviceCallInProgress { message, .. }
            | ConnectError::DeviceNotFound { message, .. }
            | ConnectError::DeviceFailure { message, .. } => message,
        }
    }

    /// Cancellations are reported softly; the UI layer does not show them
    /// as errors.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ConnectError::ActionCancelled { .. })
    }
}

impl From<DeviceError> for ConnectError {
    #[track_caller]
    fn from(error: DeviceError) -> Self {
        ConnectError::DeviceNotFound {
            message: error.message().to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ModelError> for ConnectError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        let message = match error {
            ModelError::Validation { message, .. } | ModelError::VersionParse { message, .. } => {
                message
            }
        };
        ConnectError::InvalidParameter {
            message,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
