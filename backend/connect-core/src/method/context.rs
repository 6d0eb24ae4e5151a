use crate::coins::CoinTable;
use crate::config::{ConnectSettings, FirmwareConfig};
use crate::device::{Device, DeviceCommands};
use crate::error::ConnectError;
use crate::ui::{EventSink, UiOutcome, UiPromise, UiPromiseBroker};

use models::{UiEvent, UiMessage};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

/// Read-only tables a method may consult during init.
#[derive(Clone)]
pub struct MethodEnv {
    pub coins: Arc<CoinTable>,
    pub firmware: Arc<FirmwareConfig>,
    pub settings: Arc<ConnectSettings>,
}

impl MethodEnv {
    pub fn new(coins: CoinTable, firmware: FirmwareConfig, settings: ConnectSettings) -> Self {
        Self {
            coins: Arc::new(coins),
            firmware: Arc::new(firmware),
            settings: Arc::new(settings),
        }
    }
}

/// What a method sees while it confirms and runs.
pub struct MethodContext {
    pub call_id: u64,
    device: Option<Device>,
    broker: UiPromiseBroker,
    events: EventSink,
    use_empty_passphrase: bool,
    timeout: Duration,
}

impl MethodContext {
    pub fn new(
        call_id: u64,
        device: Option<Device>,
        broker: UiPromiseBroker,
        events: EventSink,
        use_empty_passphrase: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            call_id,
            device,
            broker,
            events,
            use_empty_passphrase,
            timeout,
        }
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    #[track_caller]
    pub fn require_device(&self) -> Result<&Device, ConnectError> {
        self.device
            .as_ref()
            .ok_or_else(|| ConnectError::runtime("Method needs a device but none was acquired"))
    }

    pub fn device_path(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.path.as_str())
    }

    /// Typed calls against the acquired device.
    pub fn commands(&self) -> Result<DeviceCommands<'_>, ConnectError> {
        let device = self.require_device()?;
        Ok(DeviceCommands::new(
            device,
            &self.broker,
            &self.events,
            self.call_id,
            self.use_empty_passphrase,
            self.timeout,
        ))
    }

    pub fn post_message(&self, message: UiMessage) {
        self.events.post(self.call_id, self.device_path(), message);
    }

    pub async fn create_ui_promise(&self, event: UiEvent, request: Value) -> UiPromise {
        self.broker.create(event, self.device_path(), request).await
    }

    /// Post a confirmation request and wait for a boolean answer. A cancelled
    /// or non-boolean answer counts as a refusal.
    pub async fn request_confirmation(&self, payload: Value) -> Result<bool, ConnectError> {
        let promise = self
            .create_ui_promise(UiEvent::ReceiveConfirmation, payload.clone())
            .await;
        self.post_message(UiMessage::new(UiEvent::RequestConfirmation, payload));

        Ok(match promise.wait().await {
            UiOutcome::Resolved(answer) => answer.as_bool().unwrap_or(false),
            UiOutcome::Cancelled => false,
        })
    }
}
