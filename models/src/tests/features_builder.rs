use crate::{DeviceModel, FeaturesBuilder, FirmwareVersion, ModelError};

#[test]
fn given_complete_builder_when_built_then_features_are_populated() {
    let features = FeaturesBuilder::default()
        .with_model(DeviceModel::T)
        .with_version(2, 4, 3)
        .with_device_id("ABCD")
        .with_label("My Trezor")
        .build()
        .expect("valid features");

    assert_eq!(features.major_version, 2);
    assert_eq!(features.firmware_version(), FirmwareVersion::new(2, 4, 3));
    assert!(features.initialized, "Defaults to initialized");
    assert_eq!(features.vendor, "trezor.io");
}

#[test]
fn given_missing_model_when_built_then_returns_validation_error() {
    let result = FeaturesBuilder::default().with_version(1, 9, 0).build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **BUG THIS CATCHES**: Would catch a transport reporting major version 1 for a model T,
/// which would make the firmware resolver consult the wrong generation.
#[test]
fn given_mismatched_major_version_when_built_then_returns_validation_error() {
    let result = FeaturesBuilder::default()
        .with_model(DeviceModel::One)
        .with_version(2, 0, 0)
        .build();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("does not match model"));
}

#[test]
fn given_firmware_present_outside_bootloader_when_built_then_returns_validation_error() {
    let result = FeaturesBuilder::default()
        .with_model(DeviceModel::One)
        .with_version(1, 10, 0)
        .with_firmware_present(true)
        .build();

    assert!(result.is_err());
}
