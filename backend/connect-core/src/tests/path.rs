use crate::params::path::{
    HARDENED, from_hardened, serialized_path, slip44_by_path, to_hardened, validate_path,
};

use serde_json::json;

#[test]
fn given_string_path_when_validated_then_hardened_segments_are_flagged() {
    let path = validate_path(&json!("m/44'/60'/0'/0/0"), 3).unwrap();

    assert_eq!(
        path,
        vec![44 | HARDENED, 60 | HARDENED, HARDENED, 0, 0]
    );
}

#[test]
fn given_h_suffix_when_validated_then_same_as_apostrophe() {
    let a = validate_path(&json!("m/44h/194H/0'"), 3).unwrap();
    let b = validate_path(&json!("m/44'/194'/0'"), 3).unwrap();

    assert_eq!(a, b);
}

#[test]
fn given_array_path_when_validated_then_kept_verbatim() {
    let raw = vec![to_hardened(44), to_hardened(60), to_hardened(0)];

    assert_eq!(validate_path(&json!(raw), 3).unwrap(), raw);
}

#[test]
fn given_short_path_when_validated_then_invalid_parameter() {
    let err = validate_path(&json!("m/44'/60'"), 3).unwrap_err();

    assert_eq!(err.code(), "Method_InvalidParameter");
    assert_eq!(err.message(), "Not a valid path: expected at least 3 segments");
}

#[test]
fn given_malformed_paths_when_validated_then_rejected() {
    for bad in [
        json!("44'/60'/0'"),
        json!("m/44'/x/0'"),
        json!("m/44''/60'/0'"),
        json!([44, -1, 0]),
        json!(12),
    ] {
        assert!(validate_path(&bad, 1).is_err(), "{bad} should be rejected");
    }
}

#[test]
fn given_index_at_hardened_bit_when_string_then_rejected() {
    let raw = format!("m/{HARDENED}/0/0");

    assert!(validate_path(&json!(raw), 3).is_err());
}

#[test]
fn given_path_when_serialized_then_round_trips_through_validate() {
    let path = vec![to_hardened(44), to_hardened(194), to_hardened(0), 0, 5];

    let text = serialized_path(&path);

    assert_eq!(text, "m/44'/194'/0'/0/5");
    assert_eq!(validate_path(&json!(text), 3).unwrap(), path);
}

#[test]
fn given_bip44_path_when_slip44_then_coin_segment_unhardened() {
    let path = vec![to_hardened(44), to_hardened(60), to_hardened(0)];

    assert_eq!(slip44_by_path(&path), Some(60));
    assert_eq!(slip44_by_path(&[to_hardened(44)]), None);
    assert_eq!(from_hardened(to_hardened(7)), 7);
}
