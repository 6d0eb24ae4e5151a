use crate::config::{ConnectSettings, FirmwareConfig};
use crate::error::config::ConfigError;

use models::{CoinType, FirmwareVersion};

use tempfile::TempDir;

/// **VALUE**: A fresh install runs with defaults instead of failing.
///
/// **WHY THIS MATTERS**: The settings file is only written once the user changes
/// something. Treating its absence as an error would make first launch impossible.
///
/// **BUG THIS CATCHES**: Would catch `load` propagating the `NotFound` read error.
#[test]
fn given_no_settings_file_when_loading_then_defaults_returned() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().unwrap();

    // WHEN
    let settings = ConnectSettings::load(dir.path()).unwrap();

    // THEN
    assert_eq!(settings, ConnectSettings::default());
    assert!(!settings.trusted_host);
    assert_eq!(settings.typed_call_timeout_secs, 120);
}

#[test]
fn given_saved_settings_when_loading_then_same_values_returned() {
    let dir = TempDir::new().unwrap();
    let mut settings = ConnectSettings::default();
    settings.trusted_host = true;
    settings.origin = "https://wallet.example.com".to_string();
    settings.ipc.port = 30000;

    settings.save(dir.path()).unwrap();
    let loaded = ConnectSettings::load(dir.path()).unwrap();

    assert_eq!(loaded, settings);
    assert!(
        !dir.path().join("settings.json.tmp").exists(),
        "temp file should be renamed away"
    );
}

#[test]
fn given_partial_settings_file_when_loading_then_missing_fields_defaulted() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), r#"{ "trusted_host": true }"#).unwrap();

    let loaded = ConnectSettings::load(dir.path()).unwrap();

    assert!(loaded.trusted_host);
    assert_eq!(loaded.origin, "http://localhost");
    assert_eq!(loaded.ipc.port, 21335);
}

#[test]
fn given_corrupt_settings_file_when_loading_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

    let result = ConnectSettings::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_invalid_settings_when_validating_then_rejected() {
    let bad_origin = ConnectSettings {
        origin: "localhost".to_string(),
        ..ConnectSettings::default()
    };
    let bad_version = ConnectSettings {
        version: 0,
        ..ConnectSettings::default()
    };
    let bad_timeout = ConnectSettings {
        typed_call_timeout_secs: 0,
        ..ConnectSettings::default()
    };

    for settings in [bad_origin, bad_version, bad_timeout] {
        assert!(
            matches!(settings.validate(), Err(ConfigError::ValidationError { .. })),
            "{settings:?} should fail validation"
        );
    }
}

#[test]
fn given_invalid_settings_when_saving_then_nothing_written() {
    let dir = TempDir::new().unwrap();
    let settings = ConnectSettings {
        typed_call_timeout_secs: 0,
        ..ConnectSettings::default()
    };

    assert!(settings.save(dir.path()).is_err());
    assert!(!dir.path().join("settings.json").exists());
}

/// **VALUE**: The rules compiled into the binary parse and validate.
///
/// **WHY THIS MATTERS**: Every method's firmware window is computed from these
/// rules. A typo in the bundled TOML would only show up at runtime otherwise.
///
/// **BUG THIS CATCHES**: Would catch a malformed version string or a rule with no
/// selector slipping into `data/firmware.toml`.
#[test]
fn given_bundled_rules_when_loading_then_ethereum_rule_present() {
    let config = FirmwareConfig::bundled().unwrap();

    let rules: Vec<_> = config
        .rules_for("ethereumGetAddress", Some(CoinType::Ethereum), Some("eth"))
        .collect();

    assert!(!rules.is_empty());
    assert_eq!(
        rules[0].min,
        Some([FirmwareVersion::new(1, 6, 2), FirmwareVersion::new(2, 0, 7)])
    );
}

#[test]
fn given_excluded_method_when_selecting_rules_then_rule_skipped() {
    let config = FirmwareConfig::bundled().unwrap();

    let rules = config
        .rules_for("getCoinInfo", Some(CoinType::Ethereum), Some("eth"))
        .count();

    assert_eq!(rules, 0);
}

#[test]
fn given_coin_rule_when_shortcut_differs_in_case_then_still_selected() {
    let config = FirmwareConfig::bundled().unwrap();

    assert_eq!(config.rules_for("eosGetPublicKey", None, Some("EOS")).count(), 1);
}

#[test]
fn given_no_override_when_loading_then_bundled_used() {
    let dir = TempDir::new().unwrap();

    let config = FirmwareConfig::load(dir.path()).unwrap();

    assert_eq!(config, FirmwareConfig::bundled().unwrap());
}

#[test]
fn given_custom_override_when_loading_then_override_used() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("firmware.toml"),
        r#"
[[supported_firmware]]
methods = ["getAddress"]
min = ["1.9.0", "2.3.0"]
"#,
    )
    .unwrap();

    let config = FirmwareConfig::load(dir.path()).unwrap();

    assert_eq!(config.supported_firmware.len(), 1);
    assert_eq!(config.rules_for("getAddress", None, None).count(), 1);
}

#[test]
fn given_broken_override_when_loading_then_falls_back_to_bundled() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("firmware.toml"), "[[supported_firmware]]\nmin = 3").unwrap();

    let config = FirmwareConfig::load(dir.path()).unwrap();

    assert_eq!(config, FirmwareConfig::bundled().unwrap());
}

#[test]
fn given_rule_without_selector_when_loading_from_path_then_validation_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, "[[supported_firmware]]\nmin = [\"1.0.0\", \"2.0.0\"]\n").unwrap();

    let result = FirmwareConfig::load_from_path(&path);

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_rule_without_bounds_when_loading_from_path_then_validation_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, "[[supported_firmware]]\nmethods = [\"getAddress\"]\n").unwrap();

    let result = FirmwareConfig::load_from_path(&path);

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}
