use crate::device::{DeviceCommands, DeviceMessage};
use crate::tests::support::{DEVICE_PATH, ScriptedChannel, SilentChannel, device, features_t2};
use crate::ui::{EventSink, UiPromiseBroker};

use models::UiEvent;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

fn commands<'a>(
    device: &'a crate::device::Device,
    broker: &'a UiPromiseBroker,
    events: &'a EventSink,
) -> DeviceCommands<'a> {
    DeviceCommands::new(device, broker, events, 1, false, Duration::from_secs(5))
}

/// **VALUE**: Button interrupts are acknowledged inside the call.
///
/// **WHY THIS MATTERS**: Every signing flow may be interrupted by a button request. If
/// methods had to handle it themselves, each one would reimplement the same loop and
/// most would get it wrong.
///
/// **BUG THIS CATCHES**: Would catch the button request being returned to the method
/// as an unexpected reply.
#[tokio::test]
async fn given_button_request_when_typed_call_then_acked_and_final_reply_returned() {
    // GIVEN
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("ButtonRequest", json!({ "code": "ButtonRequest_Other" })),
        DeviceMessage::new("SignedIdentity", json!({ "address": "a" })),
    ]);
    let device = device(features_t2(), channel.clone());
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let mut ui = events.subscribe();

    // WHEN
    let reply = commands(&device, &broker, &events)
        .typed_call("SignIdentity", "SignedIdentity", json!({}))
        .await
        .unwrap();

    // THEN
    assert!(reply.is("SignedIdentity"));
    assert_eq!(channel.call_names(), vec!["SignIdentity", "ButtonAck"]);
    let posted = ui.try_recv().unwrap();
    assert_eq!(posted.message.event, UiEvent::RequestButton);
    assert_eq!(posted.device.as_deref(), Some(DEVICE_PATH));
}

#[tokio::test]
async fn given_pin_request_when_ui_answers_then_pin_forwarded() {
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("PinMatrixRequest", json!({ "type": "PinMatrixRequestType_Current" })),
        DeviceMessage::new("EosPublicKey", json!({})),
    ]);
    let device = device(features_t2(), channel.clone());
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let cmds = commands(&device, &broker, &events);

    let responder = async {
        while !broker.is_pending(UiEvent::ReceivePin, Some(DEVICE_PATH)).await {
            tokio::task::yield_now().await;
        }
        broker
            .resolve(UiEvent::ReceivePin, Some(DEVICE_PATH), json!("1234"))
            .await
    };

    let (reply, delivered) = tokio::join!(
        cmds.typed_call("EosGetPublicKey", "EosPublicKey", json!({})),
        responder
    );

    assert!(delivered);
    assert!(reply.unwrap().is("EosPublicKey"));
    let calls = channel.calls();
    assert_eq!(calls[1].0, "PinMatrixAck");
    assert_eq!(calls[1].1, json!({ "pin": "1234" }));
}

#[tokio::test]
async fn given_pin_request_when_ui_cancels_then_action_cancelled() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new("PinMatrixRequest", json!({}))]);
    let device = device(features_t2(), channel.clone());
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let cmds = commands(&device, &broker, &events);

    let canceller = async {
        while !broker.is_pending(UiEvent::ReceivePin, Some(DEVICE_PATH)).await {
            tokio::task::yield_now().await;
        }
        broker.cancel_device(DEVICE_PATH).await
    };

    let (reply, _) = tokio::join!(cmds.typed_call("GetAddress", "Address", json!({})), canceller);

    assert_eq!(reply.unwrap_err().code(), "Failure_ActionCancelled");
    assert_eq!(channel.call_names(), vec!["GetAddress"]);
}

#[tokio::test]
async fn given_passphrase_request_with_empty_passphrase_then_answered_without_ui() {
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("PassphraseRequest", json!({})),
        DeviceMessage::new("SignedIdentity", json!({})),
    ]);
    let device = device(features_t2(), channel.clone());
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());

    let reply = DeviceCommands::new(&device, &broker, &events, 1, true, Duration::from_secs(5))
        .typed_call("SignIdentity", "SignedIdentity", json!({}))
        .await;

    assert!(reply.is_ok());
    assert_eq!(channel.calls()[1], ("PassphraseAck".to_string(), json!({ "passphrase": "" })));
}

#[tokio::test]
async fn given_failure_reply_when_typed_call_then_code_preserved() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new(
        "Failure",
        json!({ "code": "Failure_DataError", "message": "Invalid path" }),
    )]);
    let device = device(features_t2(), channel);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());

    let err = commands(&device, &broker, &events)
        .typed_call("GetAddress", "Address", json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "Failure_DataError");
    assert_eq!(err.message(), "Invalid path");
}

#[tokio::test]
async fn given_action_cancelled_failure_when_typed_call_then_cancellation() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new(
        "Failure",
        json!({ "code": "Failure_ActionCancelled", "message": "Cancelled" }),
    )]);
    let device = device(features_t2(), channel);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());

    let err = commands(&device, &broker, &events)
        .typed_call("GetAddress", "Address", json!({}))
        .await
        .unwrap_err();

    assert!(err.is_cancellation());
}

#[tokio::test]
async fn given_unexpected_reply_when_typed_call_then_runtime_error() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new("Success", json!({}))]);
    let device = device(features_t2(), channel);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());

    let err = commands(&device, &broker, &events)
        .typed_call("GetAddress", "Address|PublicKey", json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "Runtime");
    assert_eq!(
        err.message(),
        "assert.fail: expected Address|PublicKey but received Success"
    );
}

#[tokio::test]
async fn given_silent_device_when_typed_call_then_times_out_as_not_found() {
    let device = device(features_t2(), Arc::new(SilentChannel));
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());

    let err = DeviceCommands::new(&device, &broker, &events, 1, false, Duration::from_millis(20))
        .typed_call("GetAddress", "Address", json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "Device_NotFound");
}
