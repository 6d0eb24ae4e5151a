use crate::helpers::{
    DEVICE_PATH, MockProvider, ScriptedChannel, auto_answer, build_core, build_core_with, device,
    drain, events_of, features,
};

use connect_core::device::DeviceMessage;
use connect_core::error::ConnectError;
use connect_core::method::{Method, MethodContext, MethodDescriptor, MethodEnv, MethodRegistry};

use models::{DeviceModel, FeaturesBuilder, Permission, UiEvent};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

// ============================================
// SPY METHOD
// ============================================

#[derive(Default)]
struct SpyCounters {
    built: AtomicUsize,
    confirmed: AtomicUsize,
    ran: AtomicUsize,
}

/// How the spy answers its confirmation step.
#[derive(Clone, Copy)]
enum Confirm {
    Approve,
    Refuse,
    Fail,
}

struct SpyMethod {
    descriptor: MethodDescriptor,
    counters: Arc<SpyCounters>,
    confirm: Confirm,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Method for SpyMethod {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn confirmation(&self, _ctx: &MethodContext) -> Result<bool, ConnectError> {
        self.counters.confirmed.fetch_add(1, Ordering::SeqCst);
        match self.confirm {
            Confirm::Approve => Ok(true),
            Confirm::Refuse => Ok(false),
            Confirm::Fail => Err(ConnectError::runtime("popup closed")),
        }
    }

    async fn run(&self, _ctx: &MethodContext) -> Result<Value, ConnectError> {
        self.counters.ran.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(json!({ "ran": true }))
    }
}

/// Registry with `spy`: requires a `value` parameter, needs no permissions.
fn spy_registry(counters: Arc<SpyCounters>, confirm: Confirm, gate: Option<Arc<Notify>>) -> MethodRegistry {
    let mut registry = MethodRegistry::with_defaults();
    registry.register(
        "spy",
        move |mut descriptor: MethodDescriptor, payload: &Value, _env: &MethodEnv| {
            counters.built.fetch_add(1, Ordering::SeqCst);
            if payload.get("value").is_none() {
                return Err(ConnectError::invalid_parameter("Parameter \"value\" is missing."));
            }
            descriptor.info = "Spy".to_string();
            Ok(Box::new(SpyMethod {
                descriptor,
                counters: counters.clone(),
                confirm,
                gate: gate.clone(),
            }) as Box<dyn Method>)
        },
    );
    registry
}

fn t2_provider() -> (Arc<ScriptedChannel>, Arc<MockProvider>) {
    let channel = ScriptedChannel::new(vec![]);
    let provider = MockProvider::with_device(device(
        features(DeviceModel::T, 2, 5, 3),
        channel.clone(),
    ));
    (channel, provider)
}

// ============================================
// ROUTING
// ============================================

/// **VALUE**: Unknown verbs fail fast with the routing error code.
///
/// **WHY THIS MATTERS**: Callers branch on `payload.code`. A typo in a method name
/// must not look like a device problem or touch the device at all.
///
/// **BUG THIS CATCHES**: Would catch the lookup falling through to device acquisition
/// or returning a generic runtime error.
#[tokio::test]
async fn given_unknown_method_when_called_then_not_allowed_and_device_untouched() {
    // GIVEN
    let (_channel, provider) = t2_provider();
    let core = build_core(provider.clone(), true);

    // WHEN
    let response = core.call(1, json!({ "method": "fooBar" })).await;

    // THEN
    assert_eq!(response.code(), Some("Method_NotAllowed"));
    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["payload"]["error"], "Method not found: fooBar");
    assert_eq!(provider.acquired(), 0);
}

#[tokio::test]
async fn given_no_method_name_when_called_then_invalid_parameter() {
    let (_channel, provider) = t2_provider();
    let core = build_core(provider, true);

    let response = core.call(1, json!({ "coin": "btc" })).await;

    assert_eq!(response.code(), Some("Method_InvalidParameter"));
}

// ============================================
// INIT
// ============================================

/// **VALUE**: A method whose init fails never reaches the device or its run step.
///
/// **WHY THIS MATTERS**: Parameter validation is the only gate before a device
/// session is opened. Running anything after a failed init would sign with
/// half-validated input.
///
/// **BUG THIS CATCHES**: Would catch the dispatcher acquiring the device before
/// building the method, or ignoring the factory's error.
#[tokio::test]
async fn given_init_failure_when_called_then_nothing_else_happens() {
    // GIVEN
    let counters = Arc::new(SpyCounters::default());
    let (channel, provider) = t2_provider();
    let core = build_core_with(spy_registry(counters.clone(), Confirm::Approve, None), provider.clone(), true);

    // WHEN: `value` is missing
    let response = core.call(3, json!({ "method": "spy" })).await;

    // THEN
    assert_eq!(response.code(), Some("Method_InvalidParameter"));
    assert_eq!(counters.built.load(Ordering::SeqCst), 1);
    assert_eq!(counters.confirmed.load(Ordering::SeqCst), 0);
    assert_eq!(counters.ran.load(Ordering::SeqCst), 0);
    assert_eq!(provider.acquired(), 0);
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_spy_method_when_called_then_success_envelope_with_id() {
    let counters = Arc::new(SpyCounters::default());
    let (_channel, provider) = t2_provider();
    let core = build_core_with(spy_registry(counters.clone(), Confirm::Approve, None), provider.clone(), true);

    let response = core.call(42, json!({ "method": "spy", "value": 1 })).await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "success": true, "id": 42, "payload": { "ran": true } })
    );
    assert_eq!(counters.confirmed.load(Ordering::SeqCst), 1);
    assert_eq!(provider.released(), vec![DEVICE_PATH.to_string()]);
}

// ============================================
// CONFIRMATION
// ============================================

#[tokio::test]
async fn given_confirmation_refused_when_called_then_cancelled_without_run() {
    let counters = Arc::new(SpyCounters::default());
    let (_channel, provider) = t2_provider();
    let core = build_core_with(spy_registry(counters.clone(), Confirm::Refuse, None), provider.clone(), true);

    let response = core.call(4, json!({ "method": "spy", "value": 1 })).await;

    assert_eq!(response.code(), Some("Failure_ActionCancelled"));
    assert_eq!(counters.ran.load(Ordering::SeqCst), 0);
    assert_eq!(
        provider.released(),
        vec![DEVICE_PATH.to_string()],
        "device must be released on failure too"
    );
}

/// **VALUE**: A confirmation step that errors is reported as a cancellation.
///
/// **WHY THIS MATTERS**: A confirmation dialog that is torn down mid-prompt is the
/// user walking away. Callers treat `Failure_ActionCancelled` as "no harm done" and
/// must not see an internal error code for it.
///
/// **BUG THIS CATCHES**: Would catch the confirmation error being propagated with
/// its own code, or the run step executing after a failed confirmation.
#[tokio::test]
async fn given_confirmation_errors_when_called_then_action_cancelled() {
    // GIVEN
    let counters = Arc::new(SpyCounters::default());
    let (channel, provider) = t2_provider();
    let core = build_core_with(spy_registry(counters.clone(), Confirm::Fail, None), provider.clone(), true);

    // WHEN
    let response = core.call(4, json!({ "method": "spy", "value": 1 })).await;

    // THEN
    assert_eq!(response.code(), Some("Failure_ActionCancelled"));
    assert_eq!(counters.confirmed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.ran.load(Ordering::SeqCst), 0);
    assert!(channel.calls().is_empty());
    assert_eq!(provider.released(), vec![DEVICE_PATH.to_string()]);
}

// ============================================
// DEVICE GATES
// ============================================

#[tokio::test]
async fn given_no_device_connected_when_device_method_called_then_not_found() {
    let core = build_core(MockProvider::empty(), true);

    let response = core.call(5, json!({ "method": "getDeviceState" })).await;

    assert_eq!(response.code(), Some("Device_NotFound"));
}

#[tokio::test]
async fn given_unknown_device_path_when_called_then_not_found() {
    let (_channel, provider) = t2_provider();
    let core = build_core(provider, true);

    let response = core
        .call(5, json!({ "method": "getDeviceState", "device": { "path": "usb-9" } }))
        .await;

    assert_eq!(response.code(), Some("Device_NotFound"));
}

/// **VALUE**: A second call on a busy device is refused, not queued behind the first.
///
/// **WHY THIS MATTERS**: Two interleaved exchanges on one device corrupt both. The
/// device protocol has no request ids to tell replies apart.
///
/// **BUG THIS CATCHES**: Would catch the session slot being released before the run
/// step finishes, or not being taken at all.
#[tokio::test]
async fn given_device_busy_when_second_call_arrives_then_call_in_progress() {
    // GIVEN: A call parked inside its run step
    let counters = Arc::new(SpyCounters::default());
    let gate = Arc::new(Notify::new());
    let (_channel, provider) = t2_provider();
    let core = build_core_with(
        spy_registry(counters.clone(), Confirm::Approve, Some(gate.clone())),
        provider,
        true,
    );

    let first = tokio::spawn({
        let core = core.clone();
        async move { core.call(1, json!({ "method": "spy", "value": 1 })).await }
    });
    while counters.ran.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // WHEN
    let second = core.call(2, json!({ "method": "spy", "value": 2 })).await;

    // THEN
    assert_eq!(second.code(), Some("Device_CallInProgress"));

    gate.notify_one();
    let first = first.await.unwrap();
    assert!(first.is_success());
    assert!(!core.is_device_busy(DEVICE_PATH));

    // AND: The slot is free again
    gate.notify_one();
    let third = core.call(3, json!({ "method": "spy", "value": 3 })).await;
    assert!(third.is_success());
}

#[tokio::test]
async fn given_bootloader_device_when_regular_method_called_then_invalid_state() {
    let channel = ScriptedChannel::new(vec![]);
    let bootloader = FeaturesBuilder::default()
        .with_model(DeviceModel::T)
        .with_version(2, 0, 0)
        .with_bootloader_mode(true)
        .with_firmware_present(true)
        .build()
        .unwrap();
    let core = build_core(MockProvider::with_device(device(bootloader, channel)), true);

    let response = core.call(6, json!({ "method": "getDeviceState" })).await;

    assert_eq!(response.code(), Some("Device_InvalidState"));
}

#[tokio::test]
async fn given_seedless_device_when_signing_method_called_then_not_initialized() {
    let channel = ScriptedChannel::new(vec![]);
    let seedless = FeaturesBuilder::default()
        .with_model(DeviceModel::T)
        .with_version(2, 5, 3)
        .with_initialized(false)
        .build()
        .unwrap();
    let core = build_core(MockProvider::with_device(device(seedless, channel.clone())), true);

    let response = core
        .call(
            7,
            json!({ "method": "requestLogin", "challengeHidden": "00", "challengeVisual": "Hi" }),
        )
        .await;

    assert_eq!(response.code(), Some("Device_NotInitialized"));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_seedless_device_allowed_by_caller_when_called_then_runs() {
    let channel = ScriptedChannel::new(vec![]);
    let seedless = FeaturesBuilder::default()
        .with_model(DeviceModel::T)
        .with_version(2, 5, 3)
        .with_initialized(false)
        .build()
        .unwrap();
    let core = build_core(MockProvider::with_device(device(seedless, channel)), true);

    let response = core
        .call(8, json!({ "method": "getDeviceState", "allowSeedlessDevice": true }))
        .await;

    assert!(response.is_success());
}

#[tokio::test]
async fn given_state_mismatch_when_called_then_invalid_state() {
    let channel = ScriptedChannel::new(vec![]);
    let dev = device(features(DeviceModel::T, 2, 5, 3), channel).with_state("wallet-a");
    let core = build_core(MockProvider::with_device(dev), true);

    let response = core
        .call(
            9,
            json!({
                "method": "getDeviceState",
                "device": { "path": DEVICE_PATH, "state": "wallet-b" }
            }),
        )
        .await;

    assert_eq!(response.code(), Some("Device_InvalidState"));
}

// ============================================
// FIRMWARE
// ============================================

#[tokio::test]
async fn given_old_firmware_when_eos_called_then_outdated() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 1, 0), channel.clone())),
        true,
    );

    let response = core
        .call(10, json!({ "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }))
        .await;

    assert_eq!(response.code(), Some("Method_FirmwareOutdated"));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_first_generation_when_eos_called_then_not_supported() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::One, 1, 10, 5), channel)),
        true,
    );

    let response = core
        .call(11, json!({ "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }))
        .await;

    assert_eq!(response.code(), Some("Method_FirmwareNotSupported"));
}

#[tokio::test]
async fn given_lisk_verb_when_called_then_not_supported_before_run() {
    let (channel, provider) = t2_provider();
    let core = build_core(provider, true);

    for method in ["liskGetAddress", "liskSignTransaction"] {
        let response = core.call(12, json!({ "method": method })).await;
        assert_eq!(response.code(), Some("Method_FirmwareNotSupported"), "{method}");
    }
    assert!(channel.calls().is_empty());
}

// ============================================
// PERMISSIONS
// ============================================

/// **VALUE**: A denied permission prompt stops the call before any device exchange.
///
/// **WHY THIS MATTERS**: Untrusted callers must not read keys or trigger signing
/// prompts without the user's consent.
///
/// **BUG THIS CATCHES**: Would catch the permission step being skipped for
/// untrusted hosts or a `false` answer being treated as granted.
#[tokio::test]
async fn given_permissions_denied_when_called_then_not_granted() {
    // GIVEN: An untrusted host and a user who declines
    let (channel, provider) = t2_provider();
    let core = build_core(provider, false);
    let _ui = auto_answer(
        &core,
        UiEvent::RequestPermission,
        UiEvent::ReceivePermission,
        json!(false),
    );

    // WHEN
    let response = core
        .call(
            13,
            json!({ "method": "requestLogin", "challengeHidden": "00", "challengeVisual": "Hi" }),
        )
        .await;

    // THEN
    assert_eq!(response.code(), Some("Method_PermissionsNotGranted"));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn given_permissions_granted_when_called_twice_then_asked_once() {
    let channel = ScriptedChannel::new(vec![
        signed_identity(),
        signed_identity(),
    ]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel)),
        false,
    );
    let mut events = core.subscribe();
    let _ui = auto_answer(
        &core,
        UiEvent::RequestPermission,
        UiEvent::ReceivePermission,
        json!({ "granted": true }),
    );
    let params = json!({ "method": "requestLogin", "challengeHidden": "00", "challengeVisual": "Hi" });

    assert!(core.call(14, params.clone()).await.is_success());
    assert!(core.call(15, params).await.is_success());

    let messages = drain(&mut events);
    let requests = events_of(&messages, UiEvent::RequestPermission);
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].message.payload["permissions"],
        json!([Permission::Read, Permission::Write])
    );
}

#[tokio::test]
async fn given_trusted_host_when_called_then_no_permission_prompt() {
    let channel = ScriptedChannel::new(vec![signed_identity()]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel)),
        true,
    );
    let mut events = core.subscribe();

    let response = core
        .call(
            16,
            json!({ "method": "requestLogin", "challengeHidden": "00", "challengeVisual": "Hi" }),
        )
        .await;

    assert!(response.is_success());
    assert!(events_of(&drain(&mut events), UiEvent::RequestPermission).is_empty());
}

fn signed_identity() -> DeviceMessage {
    DeviceMessage::new(
        "SignedIdentity",
        json!({ "address": "addr", "public_key": "pk", "signature": "sig" }),
    )
}

// ============================================
// CANCEL
// ============================================

#[tokio::test]
async fn given_pending_confirmation_when_cancelled_then_action_cancelled() {
    let channel = ScriptedChannel::new(vec![]);
    let core = build_core(
        MockProvider::with_device(device(features(DeviceModel::T, 2, 5, 3), channel.clone())),
        true,
    );
    let mut events = core.subscribe();

    let call = tokio::spawn({
        let core = core.clone();
        async move {
            core.call(17, json!({ "method": "eosGetPublicKey", "path": "m/44'/194'/0'/0/0" }))
                .await
        }
    });

    // Wait for the confirmation request to be published.
    loop {
        let message = events.recv().await.unwrap();
        if message.message.event == UiEvent::RequestConfirmation {
            break;
        }
    }
    assert_eq!(core.pending_ui_requests().await.len(), 1);
    assert_eq!(core.cancel(Some(DEVICE_PATH)).await, 1);

    let response = call.await.unwrap();
    assert_eq!(response.code(), Some("Failure_ActionCancelled"));
    assert!(channel.calls().is_empty());
    assert!(core.pending_ui_requests().await.is_empty());
}
