//! Shared fixtures for unit tests.

use crate::device::{Device, DeviceMessage, TypedCallChannel};
use crate::error::device::DeviceError;
use crate::method::MethodContext;
use crate::ui::{EventSink, UiPromiseBroker};

use common::ErrorLocation;
use models::{DeviceFeatures, DeviceModel, FeaturesBuilder};

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub const DEVICE_PATH: &str = "usb-1";

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedChannel {
    replies: Mutex<VecDeque<DeviceMessage>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedChannel {
    pub fn new(replies: Vec<DeviceMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl TypedCallChannel for ScriptedChannel {
    async fn call(&self, name: &str, payload: Value) -> Result<DeviceMessage, DeviceError> {
        self.calls.lock().unwrap().push((name.to_string(), payload));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DeviceError::Disconnected {
                message: format!("No scripted reply for {name}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Never answers.
pub struct SilentChannel;

#[async_trait]
impl TypedCallChannel for SilentChannel {
    async fn call(&self, _name: &str, _payload: Value) -> Result<DeviceMessage, DeviceError> {
        std::future::pending().await
    }
}

pub fn features_t2() -> DeviceFeatures {
    FeaturesBuilder::default()
        .with_model(DeviceModel::T)
        .with_version(2, 5, 3)
        .build()
        .unwrap()
}

pub fn features_bootloader(model: DeviceModel, firmware_present: bool) -> DeviceFeatures {
    FeaturesBuilder::default()
        .with_model(model)
        .with_version(model.major_version(), 0, 0)
        .with_bootloader_mode(true)
        .with_firmware_present(firmware_present)
        .with_initialized(false)
        .build()
        .unwrap()
}

pub fn device(features: DeviceFeatures, channel: Arc<dyn TypedCallChannel>) -> Device {
    Device::new(DEVICE_PATH, features, channel)
}

pub fn context(device: Device, broker: &UiPromiseBroker, events: &EventSink) -> MethodContext {
    MethodContext::new(
        7,
        Some(device),
        broker.clone(),
        events.clone(),
        false,
        Duration::from_secs(5),
    )
}
