//! Shared fixtures for dispatcher integration tests.
//!
//! - [`ScriptedChannel`]: canned device replies, records requests
//! - [`MockProvider`]: one or more devices, records releases
//! - [`auto_answer`]: plays the UI layer for one request type

use connect_core::Core;
use connect_core::coins::CoinTable;
use connect_core::config::{ConnectSettings, FirmwareConfig};
use connect_core::device::{
    Device, DeviceMessage, DeviceProvider, DeviceSessionOptions, TypedCallChannel,
};
use connect_core::error::device::DeviceError;
use connect_core::method::{MethodEnv, MethodRegistry};

use common::ErrorLocation;
use models::{CoreMessage, DeviceFeatures, DeviceModel, FeaturesBuilder, UiEvent, UiResponse};

use std::collections::{BTreeMap, VecDeque};
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const DEVICE_PATH: &str = "usb-1";

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

#[derive(Default)]
pub struct MockProvider {
    devices: Mutex<BTreeMap<String, Device>>,
    acquired: AtomicUsize,
    released: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_device(device: Device) -> Arc<Self> {
        let provider = Self::default();
        provider
            .devices
            .lock()
            .unwrap()
            .insert(device.path.clone(), device);
        Arc::new(provider)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceProvider for MockProvider {
    async fn enumerate(&self) -> Result<Vec<String>, DeviceError> {
        Ok(self.devices.lock().unwrap().keys().cloned().collect())
    }

    async fn acquire(
        &self,
        path: &str,
        _options: &DeviceSessionOptions,
    ) -> Result<Device, DeviceError> {
        let device = self.devices.lock().unwrap().get(path).cloned();
        let device = device.ok_or_else(|| DeviceError::Disconnected {
            message: format!("No device at {path}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(device)
    }

    async fn release(&self, path: &str, _keep_session: bool) -> Result<(), DeviceError> {
        self.released.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

pub fn features(model: DeviceModel, major: u32, minor: u32, patch: u32) -> DeviceFeatures {
    FeaturesBuilder::default()
        .with_model(model)
        .with_version(major, minor, patch)
        .build()
        .unwrap()
}

pub fn device(features: DeviceFeatures, channel: Arc<ScriptedChannel>) -> Device {
    Device::new(DEVICE_PATH, features, channel)
}

pub fn settings(trusted_host: bool) -> ConnectSettings {
    ConnectSettings {
        trusted_host,
        typed_call_timeout_secs: 5,
        ..ConnectSettings::default()
    }
}

pub fn build_core(provider: Arc<MockProvider>, trusted_host: bool) -> Core {
    build_core_with(MethodRegistry::with_defaults(), provider, trusted_host)
}

pub fn build_core_with(
    registry: MethodRegistry,
    provider: Arc<MockProvider>,
    trusted_host: bool,
) -> Core {
    let env = MethodEnv::new(
        CoinTable::bundled().unwrap(),
        FirmwareConfig::bundled().unwrap(),
        settings(trusted_host),
    );
    Core::new(registry, env, provider)
}

/// Answer every `request` event with `reply` carrying `answer`.
///
/// Subscribes before returning, so no request posted afterwards is missed.
pub fn auto_answer(core: &Core, request: UiEvent, reply: UiEvent, answer: Value) -> JoinHandle<()> {
    let mut events = core.subscribe();
    let core = core.clone();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) if message.message.event == request => {
                    core.ui_response(UiResponse {
                        event: reply,
                        payload: answer.clone(),
                        device: message.device.clone(),
                    })
                    .await;
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

pub fn drain(events: &mut broadcast::Receiver<CoreMessage>) -> Vec<CoreMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = events.try_recv() {
        messages.push(message);
    }
    messages
}

pub fn events_of(messages: &[CoreMessage], event: UiEvent) -> Vec<&CoreMessage> {
    messages.iter().filter(|m| m.message.event == event).collect()
}
