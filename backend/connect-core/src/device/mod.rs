//! Device transport contract.
//!
//! The byte-level codec belongs to the transport collaborator. This crate
//! only sees typed messages: a message name plus a JSON body.

pub mod commands;

pub use commands::DeviceCommands;

use crate::error::device::DeviceError;

use models::DeviceFeatures;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded device reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub message: Value,
}

impl DeviceMessage {
    pub fn new(message_type: impl Into<String>, message: Value) -> Self {
        Self {
            message_type: message_type.into(),
            message,
        }
    }

    pub fn is(&self, message_type: &str) -> bool {
        self.message_type == message_type
    }
}

/// A request/response channel to one acquired device.
///
/// Exactly one exchange is in flight at a time; callers await each reply
/// before sending the next request.
#[async_trait]
pub trait TypedCallChannel: Send + Sync {
    async fn call(&self, name: &str, payload: Value) -> Result<DeviceMessage, DeviceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSessionOptions {
    pub instance: Option<u32>,
    pub keep_session: bool,
}

/// Finds and opens devices.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Paths of the connected devices.
    async fn enumerate(&self) -> Result<Vec<String>, DeviceError>;

    /// Open a session and read the device's features.
    async fn acquire(&self, path: &str, options: &DeviceSessionOptions)
    -> Result<Device, DeviceError>;

    async fn release(&self, path: &str, keep_session: bool) -> Result<(), DeviceError>;
}

/// An acquired device.
#[derive(Clone)]
pub struct Device {
    pub path: String,
    pub features: DeviceFeatures,
    /// Opaque wallet-state fingerprint reported by the device.
    pub state: Option<String>,
    pub instance: u32,
    channel: Arc<dyn TypedCallChannel>,
}

impl Device {
    pub fn new(
        path: impl Into<String>,
        features: DeviceFeatures,
        channel: Arc<dyn TypedCallChannel>,
    ) -> Self {
        Self {
            path: path.into(),
            features,
            state: None,
            instance: 0,
            channel,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    pub fn channel(&self) -> &Arc<dyn TypedCallChannel> {
        &self.channel
    }

    pub fn is_bootloader(&self) -> bool {
        self.features.bootloader_mode
    }

    pub fn is_initialized(&self) -> bool {
        self.features.initialized
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("path", &self.path)
            .field("features", &self.features)
            .field("state", &self.state)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}
