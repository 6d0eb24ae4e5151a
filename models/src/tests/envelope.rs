use crate::CallResponse;

use serde_json::json;

/// **VALUE**: The success envelope serializes to the exact `{success, id, payload}` shape.
///
/// **WHY THIS MATTERS**: Callers match on these keys; the shape is a compatibility contract.
#[test]
fn given_success_when_serialized_then_matches_wire_shape() {
    let response = CallResponse::success(7, json!({ "state": "abc" }));

    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(
        value,
        json!({ "success": true, "id": 7, "payload": { "state": "abc" } })
    );
}

#[test]
fn given_failure_with_code_when_serialized_then_has_no_id() {
    let response = CallResponse::failure("Coin not found", Some("Method_UnknownCoin"));

    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(
        value,
        json!({
            "success": false,
            "payload": { "error": "Coin not found", "code": "Method_UnknownCoin" }
        })
    );
}

#[test]
fn given_failure_without_code_when_serialized_then_omits_code() {
    let value = serde_json::to_value(CallResponse::failure("boom", None)).unwrap();

    assert!(value["payload"].get("code").is_none());
}

#[test]
fn given_serialized_envelopes_when_deserialized_then_variants_are_restored() {
    let ok: CallResponse =
        serde_json::from_value(json!({ "success": true, "id": 3, "payload": 1 })).unwrap();
    let failed: CallResponse = serde_json::from_value(json!({
        "success": false,
        "payload": { "error": "x", "code": "Runtime" }
    }))
    .unwrap();

    assert!(ok.is_success());
    assert_eq!(failed.code(), Some("Runtime"));
}
