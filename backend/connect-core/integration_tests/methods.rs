use crate::helpers::{
    DEVICE_PATH, MockProvider, ScriptedChannel, auto_answer, build_core, device, drain, events_of,
    features,
};

use connect_core::device::DeviceMessage;

use models::{DeviceModel, FeaturesBuilder, UiEvent};

use serde_json::json;

const HARDENED: u32 = 0x8000_0000;

// ============================================
// getDeviceState / getCoinInfo
// ============================================

#[tokio::test]
async fn given_device_with_state_when_get_device_state_then_state_returned_without_exchange() {
    let channel = ScriptedChannel::new(vec![]);
    let dev = device(features(DeviceModel::T, 2, 5, 3), channel.clone()).with_state("abc123");
    let provider = MockProvider::with_device(dev);
    let core = build_core(provider.clone(), false);

    let response = core.call(1, json!({ "method": "getDeviceState" })).await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "success": true, "id": 1, "payload": { "state": "abc123" } })
    );
    assert!(channel.calls().is_empty());
    assert_eq!(provider.released(), vec![DEVICE_PATH.to_string()]);
}

#[tokio::test]
async fn given_known_coin_when_get_coin_info_then_no_device_needed() {
    let provider = MockProvider::empty();
    let core = build_core(provider.clone(), false);

    let response = core.call(2, json!({ "method": "getCoinInfo", "coin": "eth" })).await;

    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["payload"]["shortcut"], "ETH");
    assert_eq!(provider.acquired(), 0);
}

#[tokio::test]
async fn given_unknown_coin_when_get_coin_info_then_unknown_coin() {
    let core = build_core(MockProvider::empty(), false);

    let response = core.call(3, json!({ "method": "getCoinInfo", "coin": "doge-classic" })).await;

    assert_eq!(response.code(), Some("Method_UnknownCoin"));
}

// ============================================
// eosGetPublicKey
// ============================================

fn eos_key(n: u8) -> DeviceMessage {
    DeviceMessage::new(
        "EosPublicKey",
        json!({ "raw_public_key": format!("02{n:02x}"), "wif_public_key": format!("EOS{n}") }),
    )
}

/// **VALUE**: Bundles run one exchange per entry and report progress after each.
///
/// **WHY THIS MATTERS**: Wallet discovery exports many keys in one call. The UI shows
/// progress from the bundle events and the caller relies on results being in input
/// order.
///
/// **BUG THIS CATCHES**: Would catch a bundle returning a single object, results
/// reordered, or progress events missing an index.
#[tokio::test]
async fn given_eos_bundle_when_confirmed_then_array_in_input_order() {
    // GIVEN
    let channel = ScriptedChannel::new(vec![eos_key(1), eos_key(2)]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );
    let mut events = core.subscribe();
    let _ui = auto_answer(
        &core,
        UiEvent::RequestConfirmation,
        UiEvent::ReceiveConfirmation,
        json!(true),
    );

    // WHEN
    let response = core
        .call(
            4,
            json!({
                "method": "eosGetPublicKey",
                "bundle": [
                    { "path": "m/44'/194'/0'/0/0", "showOnTrezor": false },
                    { "path": [HARDENED + 44, HARDENED + 194, HARDENED + 1, 0, 0] }
                ]
            }),
        )
        .await;

    // THEN
    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["success"], true, "{envelope}");
    let keys = envelope["payload"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0]["wifPublicKey"], "EOS1");
    assert_eq!(keys[1]["wifPublicKey"], "EOS2");
    assert_eq!(keys[1]["serializedPath"], "m/44'/194'/1'/0/0");

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1["show_display"], false);

    let messages = drain(&mut events);
    let confirmation = events_of(&messages, UiEvent::RequestConfirmation);
    assert_eq!(confirmation[0].message.payload["label"], "Export multiple Eos public keys");
    let progress: Vec<_> = events_of(&messages, UiEvent::BundleProgress)
        .iter()
        .map(|m| m.message.payload["progress"].clone())
        .collect();
    assert_eq!(progress, vec![json!(0), json!(1)]);
}

#[tokio::test]
async fn given_single_eos_path_when_confirmed_then_object_returned() {
    let channel = ScriptedChannel::new(vec![eos_key(7)]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel)),
        true,
    );
    let mut events = core.subscribe();
    let _ui = auto_answer(
        &core,
        UiEvent::RequestConfirmation,
        UiEvent::ReceiveConfirmation,
        json!(true),
    );

    let response = core
        .call(
            5,
            json!({ "method": "eosGetPublicKey", "path": "m/44'/194'/2'/0/0", "showOnTrezor": true }),
        )
        .await;

    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["payload"]["wifPublicKey"], "EOS7");
    let messages = drain(&mut events);
    assert_eq!(
        events_of(&messages, UiEvent::RequestConfirmation)[0].message.payload,
        json!({ "view": "export-address", "label": "Export Eos public key for account #3" })
    );
    assert!(events_of(&messages, UiEvent::BundleProgress).is_empty());
}

#[tokio::test]
async fn given_eos_confirmation_declined_when_called_then_cancelled_without_exchange() {
    let channel = ScriptedChannel::new(vec![eos_key(1)]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );
    let _ui = auto_answer(
        &core,
        UiEvent::RequestConfirmation,
        UiEvent::ReceiveConfirmation,
        json!(false),
    );

    let response = core
        .call(6, json!({ "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }))
        .await;

    assert_eq!(response.code(), Some("Failure_ActionCancelled"));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_empty_eos_bundle_when_called_then_invalid_parameter() {
    let core = build_core(MockProvider::empty(), true);

    let response = core.call(7, json!({ "method": "eosGetPublicKey", "bundle": [] })).await;

    assert_eq!(response.code(), Some("Method_InvalidParameter"));
}

// ============================================
// ethereumSignTypedData
// ============================================

fn greeting_data() -> serde_json::Value {
    json!({
        "types": {
            "EIP712Domain": [{ "name": "name", "type": "string" }],
            "Greeting": [{ "name": "text", "type": "string" }]
        },
        "primaryType": "Greeting",
        "domain": { "name": "Test" },
        "message": { "text": "hi" }
    })
}

/// **VALUE**: The second-generation signing loop answers every device request and
/// returns the signature.
///
/// **WHY THIS MATTERS**: The device drives the exchange. Any request the host cannot
/// answer leaves the device waiting and the signature never arrives.
///
/// **BUG THIS CATCHES**: Would catch wrong ack message names, values encoded from the
/// wrong member, or the signature returned without the `0x` prefix.
#[tokio::test]
async fn given_typed_data_on_second_generation_when_signed_then_device_requests_answered() {
    // GIVEN
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("EthereumTypedDataStructRequest", json!({ "name": "EIP712Domain" })),
        DeviceMessage::new("EthereumTypedDataStructRequest", json!({ "name": "Greeting" })),
        DeviceMessage::new("EthereumTypedDataValueRequest", json!({ "member_path": [0, 0] })),
        DeviceMessage::new("EthereumTypedDataValueRequest", json!({ "member_path": [1, 0] })),
        DeviceMessage::new(
            "EthereumTypedDataSignature",
            json!({ "address": "0xabc", "signature": "deadbeef" }),
        ),
    ]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );

    // WHEN
    let response = core
        .call(
            8,
            json!({
                "method": "ethereumSignTypedData",
                "path": "m/44'/60'/0'/0/0",
                "metamask_v4_compat": true,
                "data": greeting_data()
            }),
        )
        .await;

    // THEN
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "success": true, "id": 8, "payload": { "address": "0xabc", "signature": "0xdeadbeef" } })
    );
    assert_eq!(
        channel.call_names(),
        vec![
            "EthereumSignTypedData",
            "EthereumTypedDataStructAck",
            "EthereumTypedDataStructAck",
            "EthereumTypedDataValueAck",
            "EthereumTypedDataValueAck",
        ]
    );
    let calls = channel.calls();
    assert_eq!(calls[0].1["primary_type"], "Greeting");
    assert_eq!(calls[3].1, json!({ "value": hex::encode("Test") }));
    assert_eq!(calls[4].1, json!({ "value": hex::encode("hi") }));
}

#[tokio::test]
async fn given_typed_data_on_first_generation_when_signed_then_hashes_sent() {
    let channel = ScriptedChannel::new(vec![DeviceMessage::new(
        "EthereumTypedDataSignature",
        json!({ "address": "0xabc", "signature": "beef" }),
    )]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::One, 1, 11, 1), channel.clone())),
        true,
    );

    let response = core
        .call(
            9,
            json!({
                "method": "ethereumSignTypedData",
                "path": "m/44'/60'/0'/0/0",
                "metamask_v4_compat": true,
                "data": greeting_data(),
                "domain_separator_hash": "0x1111",
                "message_hash": "2222"
            }),
        )
        .await;

    assert!(response.is_success());
    let calls = channel.calls();
    assert_eq!(calls[0].0, "EthereumSignTypedHash");
    assert_eq!(calls[0].1["domain_separator_hash"], "1111");
    assert_eq!(calls[0].1["message_hash"], "2222");
}

#[tokio::test]
async fn given_typed_data_below_minimum_firmware_when_signed_then_outdated() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 4, 0), channel)),
        true,
    );

    let response = core
        .call(
            10,
            json!({
                "method": "ethereumSignTypedData",
                "path": "m/44'/60'/0'/0/0",
                "metamask_v4_compat": true,
                "data": greeting_data()
            }),
        )
        .await;

    assert_eq!(response.code(), Some("Method_FirmwareOutdated"));
}

// ============================================
// requestLogin
// ============================================

/// **VALUE**: With `asyncChallenge` the challenge is fetched from the caller mid-run.
///
/// **WHY THIS MATTERS**: Login servers issue a fresh challenge only once the device is
/// ready. Signing a stale or empty challenge would let a replayed login succeed.
///
/// **BUG THIS CATCHES**: Would catch the challenge from init params being used instead
/// of the fetched one, or the identity not being derived from the origin.
#[tokio::test]
async fn given_async_challenge_when_login_then_fetched_challenge_signed() {
    // GIVEN
    let channel = ScriptedChannel::new(vec![DeviceMessage::new(
        "SignedIdentity",
        json!({ "address": "1Login", "public_key": "03ab", "signature": "99" }),
    )]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );
    let _ui = auto_answer(
        &core,
        UiEvent::LoginChallengeRequest,
        UiEvent::LoginChallengeResponse,
        json!({ "challengeHidden": "cafe", "challengeVisual": "Login to example" }),
    );

    // WHEN
    let response = core
        .call(11, json!({ "method": "requestLogin", "asyncChallenge": true }))
        .await;

    // THEN
    assert_eq!(
        serde_json::to_value(&response).unwrap()["payload"],
        json!({ "address": "1Login", "publicKey": "03ab", "signature": "99" })
    );
    let calls = channel.calls();
    assert_eq!(calls[0].0, "SignIdentity");
    assert_eq!(
        calls[0].1,
        json!({
            "identity": { "proto": "http", "host": "localhost", "index": 0 },
            "challenge_hidden": "cafe",
            "challenge_visual": "Login to example"
        })
    );
}

#[tokio::test]
async fn given_async_challenge_error_when_login_then_runtime_error() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );
    let _ui = auto_answer(
        &core,
        UiEvent::LoginChallengeRequest,
        UiEvent::LoginChallengeResponse,
        json!("server unreachable"),
    );

    let response = core
        .call(12, json!({ "method": "requestLogin", "asyncChallenge": true }))
        .await;

    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["payload"]["code"], "Runtime");
    assert_eq!(
        envelope["payload"]["error"],
        "requestLogin callback error: server unreachable"
    );
    assert!(channel.calls().is_empty());
}

// ============================================
// firmwareUpdate
// ============================================

#[tokio::test]
async fn given_wiped_first_generation_when_firmware_update_then_uploaded() {
    let channel = ScriptedChannel::new(vec![
        DeviceMessage::new("Success", json!({})),
        DeviceMessage::new("Success", json!({ "message": "Upload complete" })),
    ]);
    let bootloader = FeaturesBuilder::default()
        .with_model(DeviceModel::One)
        .with_version(1, 0, 0)
        .with_bootloader_mode(true)
        .with_firmware_present(false)
        .with_initialized(false)
        .build()
        .unwrap();
    let core = build_core(MockProvider::with_device(device(bootloader, channel.clone())), true);

    let response = core
        .call(13, json!({ "method": "firmwareUpdate", "binary": "0a0b0c" }))
        .await;

    assert!(response.is_success(), "{response:?}");
    assert_eq!(channel.calls()[1].1, json!({ "payload": "0a0b0c" }));
}

#[tokio::test]
async fn given_normal_mode_device_when_firmware_update_then_invalid_state() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel)),
        true,
    );

    let response = core
        .call(14, json!({ "method": "firmwareUpdate", "binary": "0a0b0c" }))
        .await;

    assert_eq!(response.code(), Some("Device_InvalidState"));
}
