use crate::ipc_tests::helpers::{
    TEST_AUTH_TOKEN, authenticate, connect_to_server, is_connection_closed, receive_message,
    receive_until, send_json, start_test_ipc_server,
};

use crate::helpers::DEVICE_PATH;

use connect_core::device::DeviceMessage;
use connect_core::ipc::protocol::ServerMessage;

use models::UiEvent;

use serde_json::json;

/// **VALUE**: A client holding the token is admitted and its auth request id echoed.
///
/// **WHY THIS MATTERS**: Every other frame is refused until auth succeeds. A broken
/// handshake makes the whole socket unusable.
///
/// **BUG THIS CATCHES**: Would catch the token comparison failing for a valid token or
/// the response losing the request id.
#[tokio::test]
async fn given_valid_token_when_authenticating_then_success() {
    // GIVEN
    let ipc_port = 19876;
    let (_handle, _core, _channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;

    // WHEN
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // THEN
    assert_eq!(
        response,
        ServerMessage::AuthResponse {
            request_id: 1,
            success: true,
            error: None
        }
    );
}

/// **VALUE**: A wrong token is answered with a failure and the socket is closed.
///
/// **WHY THIS MATTERS**: Any local process can reach the port. Only the embedding
/// application knows the token, so only it may drive the device.
///
/// **BUG THIS CATCHES**: Would catch an invalid token being accepted or the connection
/// staying open for retries.
#[tokio::test]
async fn given_invalid_token_when_authenticating_then_rejected_and_closed() {
    let ipc_port = 19877;
    let (_handle, _core, _channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;

    let response = authenticate(&mut ws, "wrong-token").await;

    assert_eq!(
        response,
        ServerMessage::AuthResponse {
            request_id: 1,
            success: false,
            error: Some("Invalid authentication token".to_string())
        }
    );
    assert!(is_connection_closed(&mut ws).await);
}

#[tokio::test]
async fn given_call_before_auth_when_sent_then_connection_closed() {
    let ipc_port = 19878;
    let (_handle, _core, channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;

    send_json(
        &mut ws,
        json!({ "request_id": 1, "type": "call", "payload": { "method": "getDeviceState" } }),
    )
    .await;

    assert!(is_connection_closed(&mut ws).await);
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_authenticated_when_calling_then_envelope_returned_with_request_id() {
    let ipc_port = 19879;
    let (_handle, _core, _channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    send_json(
        &mut ws,
        json!({ "request_id": 2, "type": "call", "payload": { "method": "getCoinInfo", "coin": "btc" } }),
    )
    .await;

    match receive_message(&mut ws).await {
        ServerMessage::Response {
            request_id,
            payload,
        } => {
            assert_eq!(request_id, 2);
            assert_eq!(payload["success"], true);
            assert_eq!(payload["id"], 2);
            assert_eq!(payload["payload"]["name"], "Bitcoin");
        }
        other => panic!("Expected a response, got {other:?}"),
    }
}

/// **VALUE**: UI requests reach the client as events and its answers resume the call.
///
/// **WHY THIS MATTERS**: Confirmation, PIN and permission prompts all travel this
/// path. If events or answers get stuck behind the pending call, every interactive
/// method hangs.
///
/// **BUG THIS CATCHES**: Would catch the read loop awaiting the call inline, or UI
/// events not being forwarded to authenticated clients.
#[tokio::test]
async fn given_method_needing_confirmation_when_client_answers_then_call_completes() {
    // GIVEN
    let ipc_port = 19880;
    let (_handle, _core, channel) = start_test_ipc_server(
        ipc_port,
        vec![DeviceMessage::new(
            "EosPublicKey",
            json!({ "raw_public_key": "02aa", "wif_public_key": "EOS5" }),
        )],
    )
    .await
    .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // WHEN: A call that asks for confirmation
    send_json(
        &mut ws,
        json!({
            "request_id": 3,
            "type": "call",
            "payload": { "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }
        }),
    )
    .await;

    let event = receive_until(&mut ws, |m| matches!(m, ServerMessage::Event { .. })).await;
    let ServerMessage::Event { payload } = event else {
        unreachable!()
    };
    assert_eq!(payload.id, 3);
    assert_eq!(payload.message.event, UiEvent::RequestConfirmation);

    send_json(
        &mut ws,
        json!({
            "request_id": 4,
            "type": "ui_response",
            "payload": { "type": "ui-receive_confirmation", "payload": true, "device": payload.device }
        }),
    )
    .await;

    // THEN
    let accepted = receive_until(&mut ws, |m| {
        matches!(m, ServerMessage::Response { request_id: 4, .. })
    })
    .await;
    assert_eq!(
        accepted,
        ServerMessage::Response {
            request_id: 4,
            payload: json!({ "accepted": true })
        }
    );

    let result = receive_until(&mut ws, |m| {
        matches!(m, ServerMessage::Response { request_id: 3, .. })
    })
    .await;
    let ServerMessage::Response { payload, .. } = result else {
        unreachable!()
    };
    assert_eq!(payload["success"], true);
    assert_eq!(payload["payload"]["wifPublicKey"], "EOS5");
    assert_eq!(channel.call_names(), vec!["EosGetPublicKey"]);
}

/// **VALUE**: A client that leaves mid-confirmation does not strand the device.
///
/// **WHY THIS MATTERS**: The departed client can never answer its prompt. Unless the
/// prompt is cancelled the call waits forever and holds its session slot, so every
/// later call on that device is refused as already in progress.
///
/// **BUG THIS CATCHES**: Would catch connection teardown leaving the client's UI
/// requests pending.
#[tokio::test]
async fn given_client_drops_mid_confirmation_when_next_call_arrives_then_device_free() {
    // GIVEN: A call parked on its confirmation prompt
    let ipc_port = 19883;
    let (_handle, core, channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    send_json(
        &mut ws,
        json!({
            "request_id": 3,
            "type": "call",
            "payload": { "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }
        }),
    )
    .await;
    receive_until(&mut ws, |m| matches!(m, ServerMessage::Event { .. })).await;
    assert_eq!(core.pending_ui_requests().await.len(), 1);

    // WHEN: The client goes away without answering
    drop(ws);
    for _ in 0..100 {
        if core.pending_ui_requests().await.is_empty() && !core.is_device_busy(DEVICE_PATH) {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    // THEN
    assert!(core.pending_ui_requests().await.is_empty());
    let response = core.call(9, json!({ "method": "getDeviceState" })).await;
    assert!(response.is_success(), "{response:?}");
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_nothing_pending_when_cancel_sent_then_zero_cancelled() {
    let ipc_port = 19881;
    let (_handle, _core, _channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    send_json(&mut ws, json!({ "request_id": 5, "type": "cancel" })).await;

    assert_eq!(
        receive_message(&mut ws).await,
        ServerMessage::Response {
            request_id: 5,
            payload: json!({ "cancelled": 0 })
        }
    );
}

#[tokio::test]
async fn given_malformed_frame_when_sent_then_error_and_connection_kept() {
    let ipc_port = 19882;
    let (_handle, _core, _channel) = start_test_ipc_server(ipc_port, vec![])
        .await
        .expect("Failed to start IPC server");
    let mut ws = connect_to_server(ipc_port).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    send_json(&mut ws, json!({ "type": "shutdown" })).await;
    let error = receive_message(&mut ws).await;
    assert!(matches!(error, ServerMessage::Error { request_id: 0, .. }));

    send_json(&mut ws, json!({ "request_id": 6, "type": "cancel" })).await;
    assert!(matches!(
        receive_message(&mut ws).await,
        ServerMessage::Response { request_id: 6, .. }
    ));
}

#[tokio::test]
async fn given_server_started_on_port_zero_when_handle_read_then_real_port_reported() {
    let (handle, _core, _channel) = start_test_ipc_server(0, vec![])
        .await
        .expect("Failed to start IPC server");

    assert_ne!(handle.port(), 0);
    assert_eq!(handle.auth_token(), TEST_AUTH_TOKEN);
    assert_eq!(handle.url(), format!("ws://127.0.0.1:{}", handle.port()));

    let mut ws = connect_to_server(handle.port()).await;
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    assert!(matches!(response, ServerMessage::AuthResponse { success: true, .. }));
}
