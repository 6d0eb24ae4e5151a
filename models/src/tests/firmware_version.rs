use crate::FirmwareVersion;

#[test]
fn given_zero_sentinel_when_parsed_then_is_zero_and_displays_as_zero() {
    let version = FirmwareVersion::parse("0").unwrap();

    assert!(version.is_zero());
    assert_eq!(version.to_string(), "0");
}

#[test]
fn given_short_version_when_parsed_then_missing_parts_are_zero() {
    assert_eq!(
        FirmwareVersion::parse("2.4").unwrap(),
        FirmwareVersion::new(2, 4, 0)
    );
    assert_eq!(
        FirmwareVersion::parse("1").unwrap(),
        FirmwareVersion::new(1, 0, 0)
    );
}

/// **VALUE**: Versions compare numerically, not lexically.
///
/// **BUG THIS CATCHES**: Would catch a string comparison where "1.10.0" < "1.9.0",
/// which would flag every modern first-generation device as outdated.
#[test]
fn given_two_digit_minor_when_compared_then_orders_numerically() {
    let older = FirmwareVersion::parse("1.9.4").unwrap();
    let newer = FirmwareVersion::parse("1.10.0").unwrap();

    assert!(older < newer);
}

#[test]
fn given_garbage_when_parsed_then_returns_error() {
    assert!(FirmwareVersion::parse("1..2").is_err());
    assert!(FirmwareVersion::parse("a.b.c").is_err());
    assert!(FirmwareVersion::parse("1.2.3.4").is_err());
}

#[test]
fn given_version_when_serialized_then_round_trips_as_string() {
    let version = FirmwareVersion::new(2, 4, 3);
    let json = serde_json::to_string(&version).unwrap();

    assert_eq!(json, "\"2.4.3\"");
    let back: FirmwareVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(back, version);
}
