//! Test helpers for IPC integration tests.
//!
//! - Starting a server over a core with one scripted device
//! - Connecting and authenticating
//! - Sending/receiving JSON frames
//! - Connection state checks

use crate::helpers::{MockProvider, ScriptedChannel, build_core, device, features};

use connect_core::Core;
use connect_core::device::DeviceMessage;
use connect_core::error::ipc::IpcError;
use connect_core::ipc::protocol::ServerMessage;
use connect_core::ipc::{IpcServerHandle, start_ipc_server};

use models::DeviceModel;

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server over a core whose single T device answers with `replies`.
pub async fn start_test_ipc_server(
    ipc_port: u16,
    replies: Vec<DeviceMessage>,
) -> Result<(IpcServerHandle, Core, Arc<ScriptedChannel>), IpcError> {
    let channel = ScriptedChannel::new(replies);
    let provider =
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone()));
    let core = build_core(provider, true);
    let handle =
        start_ipc_server(ipc_port, Some(String::from(TEST_AUTH_TOKEN)), core.clone()).await?;
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    Ok((handle, core, channel))
}

pub async fn connect_to_server(ipc_port: u16) -> TestSocket {
    let url = format!("ws://127.0.0.1:{}", ipc_port);
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

pub async fn send_json(ws: &mut TestSocket, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send message");
}

pub async fn receive_message(ws: &mut TestSocket) -> ServerMessage {
    let msg = tokio::time::timeout(tokio::time::Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for a message")
        .expect("No message received")
        .expect("Error receiving message");

    let text = msg.into_text().expect("Expected a text frame");
    serde_json::from_str(&text).expect("Failed to decode server message")
}

/// Read frames until one matches, skipping the rest.
pub async fn receive_until<F>(ws: &mut TestSocket, mut predicate: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let message = receive_message(ws).await;
        if predicate(&message) {
            return message;
        }
    }
}

/// Send the auth frame and return the server's answer.
pub async fn authenticate(ws: &mut TestSocket, token: &str) -> ServerMessage {
    send_json(
        ws,
        json!({ "request_id": 1, "type": "auth", "payload": { "token": token } }),
    )
    .await;
    receive_message(ws).await
}

pub async fn is_connection_closed(ws: &mut TestSocket) -> bool {
    match tokio::time::timeout(tokio::time::Duration::from_millis(100), ws.next()).await {
        Err(_) => true,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}
