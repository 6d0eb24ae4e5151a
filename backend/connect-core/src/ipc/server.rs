//! IPC WebSocket server.
//!
//! One task per connection reads frames; one writer task per connection owns
//! the sink. Call responses and broadcast UI events are funnelled to the
//! writer through an mpsc channel.

use crate::Core;
use crate::core::CallScope;
use crate::error::ipc::IpcError;
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::handle::IpcServerHandle;
use crate::ipc::protocol::{
    AuthRequest, CancelRequest, ClientMessage, ClientMessageType, ServerMessage,
};

use common::ErrorLocation;
use models::{CoreMessage, UiResponse};

use std::net::SocketAddr;
use std::panic::Location;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

const OUTGOING_CAPACITY: usize = 64;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Bind `127.0.0.1:<ipc_port>` and serve connections in the background.
///
/// A token is generated when `auth_token` is `None`; read it back from the
/// returned handle.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port cannot be bound.
pub async fn start_ipc_server(
    ipc_port: u16,
    auth_token: Option<String>,
    core: Core,
) -> Result<IpcServerHandle, IpcError> {
    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        info!("Generated IPC auth token: {}", token);
        token
    });

    let address = format!("{}:{ipc_port}", crate::CONNECT_IPC_HOSTNAME);
    let listener = TcpListener::bind(&address).await?;
    let port = listener.local_addr()?.port();

    info!("IPC server listening on {}", address);

    let token = auth_token.clone();
    TokioSpawn(async move {
        while let Ok((stream, addr)) = listener.accept().await {
            info!("Client connecting from {}", addr);
            let token_clone = token.clone();
            let core_clone = core.clone();
            TokioSpawn(async move {
                if let Err(e) = handle_connection(stream, addr, token_clone, core_clone).await {
                    error!("Connection {} ended with error: {}", addr, e);
                }
            });
        }
    });

    Ok(IpcServerHandle::new(port, auth_token))
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: String,
    core: Core,
) -> Result<(), IpcError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", addr);
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (mut write, mut read) = ws_stream.split();
    let mut state = ConnectionState::new(auth_token);

    // The first frame must authenticate.
    let first = match read.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<ClientMessage>(&text).ok(),
        Some(Ok(_)) => {
            warn!("Client {} sent non-text first message", addr);
            return Ok(());
        }
        Some(Err(e)) => {
            return Err(IpcError::Read {
                message: format!("Error reading first message: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            warn!("Client {} disconnected before sending auth", addr);
            return Ok(());
        }
    };

    let Some(first) = first.filter(|m| m.kind == ClientMessageType::Auth) else {
        warn!("Client {} auth failed: first message was not auth", addr);
        return Ok(());
    };

    let token = serde_json::from_value::<AuthRequest>(first.payload)
        .map(|auth| auth.token)
        .unwrap_or_default();

    if !state.validate_token(&token) {
        warn!("Client {} auth failed: invalid token", addr);
        send_direct(
            &mut write,
            ServerMessage::AuthResponse {
                request_id: first.request_id,
                success: false,
                error: Some("Invalid authentication token".to_string()),
            },
        )
        .await?;
        return Ok(());
    }

    info!("Client {} authenticated successfully", addr);
    send_direct(
        &mut write,
        ServerMessage::AuthResponse {
            request_id: first.request_id,
            success: true,
            error: None,
        },
    )
    .await?;

    let (outgoing, outgoing_rx) = mpsc::channel::<ServerMessage>(OUTGOING_CAPACITY);
    TokioSpawn(write_loop(write, outgoing_rx));
    let forwarder = TokioSpawn(forward_events(core.subscribe(), outgoing.clone()));
    let scope = CallScope::new();

    let mut outcome = Ok(());
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => handle_message(message, &core, &scope, &outgoing).await,
                Err(e) => {
                    warn!("Invalid frame from {}: {}", addr, e);
                    let _ = outgoing
                        .send(ServerMessage::Error {
                            request_id: 0,
                            message: format!("Invalid message: {e}"),
                        })
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => debug!("Ignoring non-text frame from {}", addr),
            Err(e) => {
                outcome = Err(IpcError::Read {
                    message: format!("Error reading message: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
                break;
            }
        }
    }

    // Nobody is left to answer this client's prompts.
    scope.close();
    if !scope.is_empty() {
        let cancelled = core.cancel_scope(&scope).await;
        info!("Client {} left with calls in flight, {} prompt(s) cancelled", addr, cancelled);
    }

    // The writer exits once in-flight calls drop their senders.
    forwarder.abort();
    info!("Client {} disconnected", addr);
    outcome
}

async fn handle_message(
    message: ClientMessage,
    core: &Core,
    scope: &CallScope,
    outgoing: &mpsc::Sender<ServerMessage>,
) {
    let request_id = message.request_id;

    match message.kind {
        ClientMessageType::Call => {
            let core = core.clone();
            let scope = scope.clone();
            let outgoing = outgoing.clone();
            TokioSpawn(async move {
                let response = core.call_in_scope(request_id, message.payload, &scope).await;
                let payload = serde_json::to_value(&response).unwrap_or_else(|e| {
                    json!({ "success": false, "payload": { "error": e.to_string() } })
                });
                if outgoing
                    .send(ServerMessage::Response { request_id, payload })
                    .await
                    .is_err()
                {
                    warn!("Connection closed before call {} finished", request_id);
                }
            });
        }
        ClientMessageType::UiResponse => {
            let reply = match serde_json::from_value::<UiResponse>(message.payload) {
                Ok(response) => {
                    let accepted = core.ui_response(response).await;
                    ServerMessage::Response {
                        request_id,
                        payload: json!({ "accepted": accepted }),
                    }
                }
                Err(e) => ServerMessage::Error {
                    request_id,
                    message: format!("Invalid ui_response: {e}"),
                },
            };
            let _ = outgoing.send(reply).await;
        }
        ClientMessageType::Cancel => {
            let cancel = if message.payload.is_null() {
                CancelRequest::default()
            } else {
                serde_json::from_value::<CancelRequest>(message.payload).unwrap_or_default()
            };
            let cancelled = core.cancel(cancel.device.as_deref()).await;
            let _ = outgoing
                .send(ServerMessage::Response {
                    request_id,
                    payload: json!({ "cancelled": cancelled }),
                })
                .await;
        }
        ClientMessageType::Auth => {
            let _ = outgoing
                .send(ServerMessage::Error {
                    request_id,
                    message: "Auth handshake already completed".to_string(),
                })
                .await;
        }
    }
}

async fn write_loop(mut write: WsSink, mut outgoing: mpsc::Receiver<ServerMessage>) {
    while let Some(message) = outgoing.recv().await {
        if let Err(e) = send_direct(&mut write, message).await {
            error!("IPC write failed: {}", e);
            break;
        }
    }
    let _ = write.close().await;
}

async fn forward_events(
    mut events: broadcast::Receiver<CoreMessage>,
    outgoing: mpsc::Sender<ServerMessage>,
) {
    loop {
        match events.recv().await {
            Ok(payload) => {
                if outgoing.send(ServerMessage::Event { payload }).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("IPC client lagged, {} UI event(s) dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_direct(write: &mut WsSink, message: ServerMessage) -> Result<(), IpcError> {
    write
        .send(message.to_frame()?)
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send message: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
