//! JSON frames exchanged over the IPC socket.
//!
//! Client to server: `{request_id, type, payload}` with `type` one of
//! `auth`, `call`, `ui_response` or `cancel`. Server to client: responses
//! tagged with the request id, and unsolicited `event` frames carrying UI
//! messages.

use crate::error::ipc::IpcError;

use models::CoreMessage;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessageType {
    Auth,
    Call,
    UiResponse,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub request_id: u64,
    #[serde(rename = "type")]
    pub kind: ClientMessageType,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthResponse {
        request_id: u64,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Response {
        request_id: u64,
        payload: Value,
    },
    Event {
        payload: CoreMessage,
    },
    Error {
        request_id: u64,
        message: String,
    },
}

impl ServerMessage {
    pub fn to_frame(&self) -> Result<Message, IpcError> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}
