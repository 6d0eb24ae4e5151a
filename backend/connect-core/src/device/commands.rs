//! Typed calls with interrupt handling.
//!
//! Methods only name the request and the reply types they expect. Button,
//! PIN and passphrase interrupts the device raises in between are answered
//! here, so methods never see them.

use crate::device::{Device, DeviceMessage};
use crate::error::ConnectError;
use crate::error::device::DeviceError;
use crate::ui::{EventSink, UiOutcome, UiPromiseBroker};

use common::{ErrorLocation, RedactedSecret};
use models::{UiEvent, UiMessage};

use std::panic::Location;
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

const FAILURE: &str = "Failure";
const BUTTON_REQUEST: &str = "ButtonRequest";
const PIN_MATRIX_REQUEST: &str = "PinMatrixRequest";
const PASSPHRASE_REQUEST: &str = "PassphraseRequest";

pub struct DeviceCommands<'a> {
    device: &'a Device,
    broker: &'a UiPromiseBroker,
    events: &'a EventSink,
    call_id: u64,
    use_empty_passphrase: bool,
    timeout: Duration,
}

impl<'a> DeviceCommands<'a> {
    pub fn new(
        device: &'a Device,
        broker: &'a UiPromiseBroker,
        events: &'a EventSink,
        call_id: u64,
        use_empty_passphrase: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            device,
            broker,
            events,
            call_id,
            use_empty_passphrase,
            timeout,
        }
    }

    /// Send `name` and return the first reply whose type is in `expected`
    /// (a `|`-separated union).
    pub async fn typed_call(
        &self,
        name: &str,
        expected: &str,
        payload: Value,
    ) -> Result<DeviceMessage, ConnectError> {
        let mut response = self.exchange(name, payload).await?;

        loop {
            if expected.split('|').any(|t| t == response.message_type) {
                return Ok(response);
            }

            response = match response.message_type.as_str() {
                FAILURE => return Err(failure_to_error(&response.message)),
                BUTTON_REQUEST => self.on_button_request(&response.message).await?,
                PIN_MATRIX_REQUEST => self.on_pin_request(&response.message).await?,
                PASSPHRASE_REQUEST => self.on_passphrase_request().await?,
                other => {
                    return Err(ConnectError::runtime(format!(
                        "assert.fail: expected {expected} but received {other}"
                    )));
                }
            };
        }
    }

    async fn exchange(&self, name: &str, payload: Value) -> Result<DeviceMessage, ConnectError> {
        debug!("[{}] -> {}", self.device.path, name);
        let reply = tokio::time::timeout(self.timeout, self.device.channel().call(name, payload))
            .await
            .map_err(|_| DeviceError::Timeout {
                message: format!("No reply to {name} within {:?}", self.timeout),
                location: ErrorLocation::from(Location::caller()),
            })??;
        debug!("[{}] <- {}", self.device.path, reply.message_type);
        Ok(reply)
    }

    async fn on_button_request(&self, request: &Value) -> Result<DeviceMessage, ConnectError> {
        self.post(UiMessage::new(UiEvent::RequestButton, request.clone()));
        self.exchange("ButtonAck", json!({})).await
    }

    async fn on_pin_request(&self, request: &Value) -> Result<DeviceMessage, ConnectError> {
        let promise = self
            .broker
            .create(UiEvent::ReceivePin, Some(&self.device.path), request.clone())
            .await;
        self.post(UiMessage::new(UiEvent::RequestPin, request.clone()));

        let pin = match promise.wait().await {
            UiOutcome::Resolved(payload) => secret_from(&payload)?,
            UiOutcome::Cancelled => return Err(ConnectError::action_cancelled()),
        };

        debug!("[{}] PIN entered ({} digits)", self.device.path, pin.len());
        self.exchange("PinMatrixAck", json!({ "pin": pin.expose() })).await
    }

    async fn on_passphrase_request(&self) -> Result<DeviceMessage, ConnectError> {
        let passphrase = if self.use_empty_passphrase {
            RedactedSecret::default()
        } else {
            let promise = self
                .broker
                .create(UiEvent::ReceivePassphrase, Some(&self.device.path), Value::Null)
                .await;
            self.post(UiMessage::empty(UiEvent::RequestPassphrase));

            match promise.wait().await {
                UiOutcome::Resolved(payload) => secret_from(&payload)?,
                UiOutcome::Cancelled => return Err(ConnectError::action_cancelled()),
            }
        };

        self.exchange("PassphraseAck", json!({ "passphrase": passphrase.expose() }))
            .await
    }

    fn post(&self, message: UiMessage) {
        self.events
            .post(self.call_id, Some(&self.device.path), message);
    }
}

/// UI answers carry the secret either directly as a string or as
/// `{value: "..."}`.
fn secret_from(payload: &Value) -> Result<RedactedSecret, ConnectError> {
    payload
        .as_str()
        .or_else(|| payload.get("value").and_then(Value::as_str))
        .map(RedactedSecret::new)
        .ok_or_else(|| ConnectError::invalid_parameter("UI response carries no value"))
}

/// Map a device `Failure` reply to an error, keeping its code.
#[track_caller]
pub fn failure_to_error(message: &Value) -> ConnectError {
    let code = message
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("Failure_UnexpectedMessage");
    let text = message
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Failure")
        .to_string();

    match code {
        "Failure_ActionCancelled" | "Failure_PinCancelled" => ConnectError::ActionCancelled {
            message: text,
            location: ErrorLocation::from(Location::caller()),
        },
        _ => ConnectError::DeviceFailure {
            code: code.to_string(),
            message: text,
            location: ErrorLocation::from(Location::caller()),
        },
    }
}
