//! Out-of-band messages exchanged with the UI layer while a call runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UI event names. Requests flow out to the UI layer, `Receive*` /
/// `*Response` events flow back in through `uiResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiEvent {
    #[serde(rename = "ui-request_confirmation")]
    RequestConfirmation,
    #[serde(rename = "ui-receive_confirmation")]
    ReceiveConfirmation,
    #[serde(rename = "ui-request_permission")]
    RequestPermission,
    #[serde(rename = "ui-receive_permission")]
    ReceivePermission,
    #[serde(rename = "ui-button")]
    RequestButton,
    #[serde(rename = "ui-request_pin")]
    RequestPin,
    #[serde(rename = "ui-receive_pin")]
    ReceivePin,
    #[serde(rename = "ui-request_passphrase")]
    RequestPassphrase,
    #[serde(rename = "ui-receive_passphrase")]
    ReceivePassphrase,
    #[serde(rename = "ui-bundle_progress")]
    BundleProgress,
    #[serde(rename = "ui-firmware-progress")]
    FirmwareProgress,
    #[serde(rename = "ui-login_challenge_request")]
    LoginChallengeRequest,
    #[serde(rename = "ui-login_challenge_response")]
    LoginChallengeResponse,
}

impl UiEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiEvent::RequestConfirmation => "ui-request_confirmation",
            UiEvent::ReceiveConfirmation => "ui-receive_confirmation",
            UiEvent::RequestPermission => "ui-request_permission",
            UiEvent::ReceivePermission => "ui-receive_permission",
            UiEvent::RequestButton => "ui-button",
            UiEvent::RequestPin => "ui-request_pin",
            UiEvent::ReceivePin => "ui-receive_pin",
            UiEvent::RequestPassphrase => "ui-request_passphrase",
            UiEvent::ReceivePassphrase => "ui-receive_passphrase",
            UiEvent::BundleProgress => "ui-bundle_progress",
            UiEvent::FirmwareProgress => "ui-firmware-progress",
            UiEvent::LoginChallengeRequest => "ui-login_challenge_request",
            UiEvent::LoginChallengeResponse => "ui-login_challenge_response",
        }
    }
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One UI message: an event name plus its payload. Confirmation requests
/// carry a `view` discriminator inside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(rename = "type")]
    pub event: UiEvent,
    #[serde(default)]
    pub payload: Value,
}

impl UiMessage {
    pub fn new(event: UiEvent, payload: Value) -> Self {
        Self { event, payload }
    }

    pub fn empty(event: UiEvent) -> Self {
        Self::new(event, Value::Null)
    }
}

/// A UI message published by the dispatcher, tagged with the call it
/// belongs to and the device path (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreMessage {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(flatten)]
    pub message: UiMessage,
}

/// Incoming answer from the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiResponse {
    #[serde(rename = "type")]
    pub event: UiEvent,
    #[serde(default)]
    pub payload: Value,
    /// Device path the answer is for. When absent the single pending
    /// request of this type is resolved.
    #[serde(default)]
    pub device: Option<String>,
}
