//! Firmware window computation and the device check.
//!
//! A method starts from its descriptor's [`FirmwareRange`] and narrows it
//! with the coin's support table and every matching firmware rule. The
//! resulting window is only enforced once a device is connected.

use crate::config::FirmwareConfig;
use crate::error::ConnectError;

use common::ErrorLocation;
use models::{CoinInfo, DeviceFeatures, FirmwareBounds, FirmwareCheck, FirmwareRange, FirmwareVersion};

use std::panic::Location;

/// Narrow `current` for `method`, optionally called for `coin`.
///
/// Never widens: every bound moves towards the inside of the window.
pub fn get_firmware_range(
    method: &str,
    coin: Option<&CoinInfo>,
    current: &FirmwareRange,
    config: &FirmwareConfig,
) -> FirmwareRange {
    let mut range = current.clone();

    if let Some(info) = coin {
        let zero = FirmwareVersion::zero();
        let t1 = info.support.trezor1.as_ref().unwrap_or(&zero);
        let t2 = info.support.trezor2.as_ref().unwrap_or(&zero);
        range = FirmwareRange::new(range.t1.narrow(Some(t1), None), range.t2.narrow(Some(t2), None));
    }

    let coin_type = coin.map(|info| info.coin_type);
    let shortcut = coin.map(|info| info.shortcut.to_lowercase());

    for rule in config.rules_for(method, coin_type, shortcut.as_deref()) {
        let [min_t1, min_t2] = split(rule.min.as_ref());
        let [max_t1, max_t2] = split(rule.max.as_ref());
        range = FirmwareRange::new(
            range.t1.narrow(min_t1, max_t1),
            range.t2.narrow(min_t2, max_t2),
        );
    }

    range
}

fn split(pair: Option<&[FirmwareVersion; 2]>) -> [Option<&FirmwareVersion>; 2] {
    match pair {
        Some([t1, t2]) => [Some(t1), Some(t2)],
        None => [None, None],
    }
}

/// Match the connected device against the method's window.
#[track_caller]
pub fn check_device_firmware(
    range: &FirmwareRange,
    features: &DeviceFeatures,
) -> Result<(), ConnectError> {
    let version = features.firmware_version();
    let Some(bounds) = range.get(features.major_version) else {
        return Err(ConnectError::FirmwareNotSupported {
            message: format!("Unknown device generation {}", features.major_version),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    match bounds.check(&version) {
        FirmwareCheck::Supported => Ok(()),
        FirmwareCheck::Outdated => Err(ConnectError::FirmwareOutdated {
            message: format!(
                "Firmware {version} is outdated, {} or newer required",
                bounds.min
            ),
            location: ErrorLocation::from(Location::caller()),
        }),
        FirmwareCheck::NotSupported => Err(ConnectError::FirmwareNotSupported {
            message: not_supported_message(bounds, &version),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

fn not_supported_message(bounds: &FirmwareBounds, version: &FirmwareVersion) -> String {
    if bounds.is_disabled() {
        "Method not supported by this device".to_string()
    } else if !bounds.is_satisfiable() {
        format!("No firmware satisfies {}..{}", bounds.min, bounds.max)
    } else {
        format!("Firmware {version} is newer than the supported {}", bounds.max)
    }
}
