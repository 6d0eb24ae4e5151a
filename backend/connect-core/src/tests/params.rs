use crate::params::{FieldSpec, FieldType, validate_all, validate_params};

use serde_json::json;

fn message_of(input: serde_json::Value, specs: &[FieldSpec]) -> String {
    validate_params(&input, specs)
        .expect_err("validation should fail")
        .message()
        .to_string()
}

/// **VALUE**: The first violation reported is the first one in declaration order.
///
/// **WHY THIS MATTERS**: Callers fix their parameters one error at a time. If the reported
/// field depended on map iteration order, the same bad call would yield different errors
/// across runs.
///
/// **BUG THIS CATCHES**: Would catch iterating the input object instead of the spec list.
#[test]
fn given_two_bad_fields_when_validated_then_first_declared_is_reported() {
    // GIVEN: Both fields are wrong
    let input = json!({ "b": 5, "a": 5 });
    let specs = [
        FieldSpec::new("a", FieldType::String).required(),
        FieldSpec::new("b", FieldType::String).required(),
    ];

    // WHEN / THEN
    assert_eq!(
        message_of(input, &specs),
        "Parameter \"a\" has invalid type. \"string\" expected."
    );
}

#[test]
fn given_two_bad_fields_when_validate_all_then_both_reported_in_order() {
    let input = json!({ "b": 5 });
    let specs = [
        FieldSpec::new("a", FieldType::String).required(),
        FieldSpec::new("b", FieldType::String).required(),
    ];

    let errors = validate_all(&input, &specs);

    let messages: Vec<&str> = errors.iter().map(|e| e.message()).collect();
    assert_eq!(
        messages,
        vec![
            "Parameter \"a\" is missing.",
            "Parameter \"b\" has invalid type. \"string\" expected.",
        ]
    );
}

#[test]
fn given_required_field_is_null_when_validated_then_missing() {
    let specs = [FieldSpec::new("coin", FieldType::String).required()];

    let err = validate_params(&json!({ "coin": null }), &specs).unwrap_err();

    assert_eq!(err.code(), "Method_InvalidParameter");
    assert_eq!(err.message(), "Parameter \"coin\" is missing.");
}

#[test]
fn given_optional_field_absent_when_validated_then_ok() {
    let specs = [FieldSpec::new("showOnTrezor", FieldType::Boolean)];

    assert!(validate_params(&json!({}), &specs).is_ok());
}

#[test]
fn given_unknown_extra_fields_when_validated_then_ignored() {
    let specs = [FieldSpec::new("coin", FieldType::String).required()];

    let result = validate_params(&json!({ "coin": "btc", "extra": [1, 2, 3] }), &specs);

    assert!(result.is_ok());
}

#[test]
fn given_required_empty_string_when_validated_then_empty_error() {
    let specs = [FieldSpec::new("coin", FieldType::String).required()];

    assert_eq!(
        message_of(json!({ "coin": "" }), &specs),
        "Parameter \"coin\" is empty."
    );
}

#[test]
fn given_allow_empty_when_empty_string_then_ok() {
    let specs = [FieldSpec::new("label", FieldType::String)
        .required()
        .allow_empty()];

    assert!(validate_params(&json!({ "label": "" }), &specs).is_ok());
}

#[test]
fn given_empty_array_when_validated_then_empty_error() {
    let specs = [FieldSpec::new("bundle", FieldType::Array)];

    assert_eq!(
        message_of(json!({ "bundle": [] }), &specs),
        "Parameter \"bundle\" is empty."
    );
}

/// **VALUE**: Array elements are checked with the element spec and named by index.
///
/// **BUG THIS CATCHES**: Would catch the element spec being ignored, letting a
/// malformed bundle item reach the device.
#[test]
fn given_array_with_bad_element_when_validated_then_element_named_by_index() {
    let specs = [FieldSpec::new("amounts", FieldType::Array)
        .elements(FieldSpec::new("amount", FieldType::Uint))];

    assert_eq!(
        message_of(json!({ "amounts": ["1", "2", "x"] }), &specs),
        "Parameter \"amounts[2]\" has invalid type. \"uint\" expected."
    );
}

#[test]
fn given_uint_field_when_various_inputs_then_only_unsigned_integers_pass() {
    let specs = [FieldSpec::new("amount", FieldType::Uint).required()];

    for ok in [json!(0), json!(42), json!("0"), json!("1234567890123456789012")] {
        assert!(
            validate_params(&json!({ "amount": ok }), &specs).is_ok(),
            "{ok} should pass"
        );
    }

    for bad in [json!(-1), json!("-1"), json!(1.5), json!("01"), json!("1e3"), json!(true)] {
        assert!(
            validate_params(&json!({ "amount": bad }), &specs).is_err(),
            "{bad} should fail"
        );
    }
}

#[test]
fn given_allow_negative_when_negative_uint_then_ok() {
    let specs = [FieldSpec::new("fee", FieldType::Uint).allow_negative()];

    assert!(validate_params(&json!({ "fee": "-15" }), &specs).is_ok());
    assert!(validate_params(&json!({ "fee": -15 }), &specs).is_ok());
}

#[test]
fn given_untyped_spec_when_any_value_then_only_presence_checked() {
    let specs = [FieldSpec::any("path").required()];

    assert!(validate_params(&json!({ "path": [1, 2] }), &specs).is_ok());
    assert!(validate_params(&json!({ "path": "m/44'" }), &specs).is_ok());
    assert!(validate_params(&json!({}), &specs).is_err());
}

#[test]
fn given_non_object_input_when_required_field_then_missing() {
    let specs = [FieldSpec::new("coin", FieldType::String).required()];

    assert_eq!(message_of(json!("btc"), &specs), "Parameter \"coin\" is missing.");
}
