use crate::device::DeviceMessage;
use crate::methods::firmware_update::{progress_percent, upload_firmware};
use crate::tests::support::{ScriptedChannel, context, device, features_bootloader};
use crate::ui::{EventSink, UiPromiseBroker};

use models::{CoreMessage, DeviceModel, UiEvent};

use serde_json::json;
use tokio::sync::broadcast;

fn drain(ui: &mut broadcast::Receiver<CoreMessage>) -> Vec<CoreMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = ui.try_recv() {
        messages.push(message);
    }
    messages
}

fn progress_of(messages: &[CoreMessage]) -> Vec<u64> {
    messages
        .iter()
        .filter(|m| m.message.event == UiEvent::FirmwareProgress)
        .filter_map(|m| m.message.payload["progress"].as_u64())
        .collect()
}

/// **VALUE**: The second generation pulls exactly the slices it asks for.
///
/// **WHY THIS MATTERS**: A wrong slice bricks the upload: the device verifies the image
/// hash only at the end, after the old firmware is already erased.
///
/// **BUG THIS CATCHES**: Would catch off-by-one slicing, uploading the whole image per
/// request, or progress computed from the chunk length instead of the offset.
#[tokio::test]
async fn given_gen2_chunk_requests_when_uploading_then_requested_slices_sent_with_progress() {
    // GIVEN: A 1000 byte image and a device asking for it in three chunks
    let image: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("FirmwareRequest", json!({ "offset": 0, "length": 400 })),
        DeviceMessage::new("FirmwareRequest", json!({ "offset": 400, "length": 400 })),
        DeviceMessage::new("FirmwareRequest", json!({ "offset": 800, "length": 200 })),
        DeviceMessage::new("Success", json!({})),
    ]);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let mut ui = events.subscribe();
    let ctx = context(
        device(features_bootloader(DeviceModel::T, true), channel.clone()),
        &broker,
        &events,
    );

    // WHEN
    let result = upload_firmware(&ctx, &image).await;

    // THEN
    assert!(result.is_ok());
    let calls = channel.calls();
    assert_eq!(calls[0], ("FirmwareErase".to_string(), json!({ "length": 1000 })));

    let uploads: Vec<&serde_json::Value> = calls
        .iter()
        .filter(|(name, _)| name == "FirmwareUpload")
        .map(|(_, payload)| &payload["payload"])
        .collect();
    assert_eq!(uploads.len(), 3);
    assert_eq!(uploads[0], &json!(hex::encode(&image[0..400])));
    assert_eq!(uploads[1], &json!(hex::encode(&image[400..800])));
    assert_eq!(uploads[2], &json!(hex::encode(&image[800..1000])));

    let messages = drain(&mut ui);
    assert_eq!(progress_of(&messages), vec![40, 80, 100]);
    assert_eq!(messages[0].message.event, UiEvent::RequestButton);
}

#[tokio::test]
async fn given_gen1_device_when_uploading_then_single_upload_with_progress_bookends() {
    let image = vec![0xAA; 64];
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("Success", json!({})),
        DeviceMessage::new("Success", json!({ "message": "done" })),
    ]);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let mut ui = events.subscribe();
    let ctx = context(
        device(features_bootloader(DeviceModel::One, false), channel.clone()),
        &broker,
        &events,
    );

    let result = upload_firmware(&ctx, &image).await.unwrap();

    assert_eq!(result, json!({ "message": "done" }));
    assert_eq!(channel.call_names(), vec!["FirmwareErase", "FirmwareUpload"]);
    let messages = drain(&mut ui);
    assert_eq!(progress_of(&messages), vec![0, 100]);
    assert!(
        messages.iter().all(|m| m.message.event != UiEvent::RequestButton),
        "wiped device needs no confirmation"
    );
}

#[tokio::test]
async fn given_chunk_request_outside_image_when_uploading_then_runtime_error() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new(
        "FirmwareRequest",
        json!({ "offset": 900, "length": 400 }),
    )]);
    let (broker, events) = (UiPromiseBroker::new(), EventSink::new());
    let ctx = context(
        device(features_bootloader(DeviceModel::T, true), channel),
        &broker,
        &events,
    );

    let err = upload_firmware(&ctx, &[0u8; 1000]).await.unwrap_err();

    assert_eq!(err.code(), "Runtime");
}

#[test]
fn given_offsets_when_progress_computed_then_rounded_percent() {
    assert_eq!(progress_percent(0, 1000), 0);
    assert_eq!(progress_percent(333, 1000), 33);
    assert_eq!(progress_percent(336, 1000), 34);
    assert_eq!(progress_percent(1000, 1000), 100);
    assert_eq!(progress_percent(0, 0), 100);
}
