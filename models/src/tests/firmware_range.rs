use crate::{FirmwareBounds, FirmwareCheck, FirmwareRange, FirmwareVersion};

fn v(raw: &str) -> FirmwareVersion {
    FirmwareVersion::parse(raw).unwrap()
}

/// **VALUE**: Narrowing only ever tightens a window.
///
/// **WHY THIS MATTERS**: Methods narrow their range repeatedly (once per coin, once per
/// feature flag). A widening step would let a method run on firmware that is known to
/// produce wrong results.
///
/// **BUG THIS CATCHES**: Would catch `narrow` picking the entry value unconditionally
/// instead of max/min against the current bounds.
#[test]
fn given_bounds_when_narrowed_then_min_never_decreases_and_max_never_increases() {
    let current = FirmwareBounds::new(v("2.3.0"), v("2.9.0"));

    let looser = current.narrow(Some(&v("2.1.0")), Some(&v("3.0.0")));
    assert_eq!(looser, current, "Looser entry must not widen");

    let tighter = current.narrow(Some(&v("2.4.1")), Some(&v("2.8.0")));
    assert_eq!(tighter, FirmwareBounds::new(v("2.4.1"), v("2.8.0")));
}

#[test]
fn given_same_entry_when_narrowed_twice_then_result_is_idempotent() {
    let current = FirmwareBounds::new(v("1.6.0"), v("0"));
    let once = current.narrow(Some(&v("1.10.4")), Some(&v("1.12.0")));
    let twice = once.narrow(Some(&v("1.10.4")), Some(&v("1.12.0")));

    assert_eq!(once, twice);
}

#[test]
fn given_unbounded_max_when_narrowed_with_ceiling_then_takes_ceiling() {
    let current = FirmwareBounds::new(v("2.0.0"), v("0"));
    let narrowed = current.narrow(None, Some(&v("2.5.0")));

    assert_eq!(narrowed.max, v("2.5.0"));
}

/// **VALUE**: A "0" floor disables a generation and nothing re-enables it.
#[test]
fn given_disabled_bounds_when_narrowed_with_real_floor_then_stays_disabled() {
    let disabled = FirmwareBounds::new(v("1.0.0"), v("0")).narrow(Some(&v("0")), None);
    assert!(disabled.is_disabled());

    let still = disabled.narrow(Some(&v("1.9.0")), None);
    assert!(still.is_disabled());
}

#[test]
fn given_empty_window_when_checked_then_not_supported() {
    let empty = FirmwareBounds::new(v("2.5.0"), v("2.4.0"));

    assert!(!empty.is_satisfiable());
    assert_eq!(empty.check(&v("2.4.5")), FirmwareCheck::NotSupported);
}

#[test]
fn given_device_versions_when_checked_then_classified() {
    let bounds = FirmwareBounds::new(v("2.4.3"), v("2.6.0"));

    assert_eq!(bounds.check(&v("2.4.2")), FirmwareCheck::Outdated);
    assert_eq!(bounds.check(&v("2.4.3")), FirmwareCheck::Supported);
    assert_eq!(bounds.check(&v("2.6.0")), FirmwareCheck::Supported);
    assert_eq!(bounds.check(&v("2.6.1")), FirmwareCheck::NotSupported);
}

#[test]
fn given_range_when_serialized_then_uses_generation_keys() {
    let range = FirmwareRange::default();
    let json = serde_json::to_value(&range).unwrap();

    assert_eq!(json["1"]["min"], "1.0.0");
    assert_eq!(json["1"]["max"], "0");
    assert_eq!(json["2"]["min"], "2.0.0");
}

#[test]
fn given_narrowed_range_when_compared_then_is_within_original() {
    let original = FirmwareRange::default();
    let narrowed = FirmwareRange::new(
        original.t1.narrow(Some(&v("1.10.4")), None),
        original.t2.narrow(Some(&v("2.4.3")), Some(&v("2.9.9"))),
    );

    assert!(narrowed.is_within(&original));
    assert!(!original.is_within(&narrowed));
    assert!(FirmwareRange::unsupported().is_within(&narrowed));
}
