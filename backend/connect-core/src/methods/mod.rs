//! Built-in method catalogue.

pub mod eos_get_public_key;
pub mod ethereum;
pub mod firmware_update;
pub mod format;
pub mod get_coin_info;
pub mod get_device_state;
pub mod lisk_deprecated;
pub mod request_login;

use crate::method::MethodRegistry;

pub use eos_get_public_key::EosGetPublicKey;
pub use ethereum::EthereumSignTypedData;
pub use firmware_update::FirmwareUpdate;
pub use get_coin_info::GetCoinInfo;
pub use get_device_state::GetDeviceState;
pub use lisk_deprecated::LiskDeprecated;
pub use request_login::RequestLogin;

pub fn register_defaults(registry: &mut MethodRegistry) {
    registry.register(get_device_state::METHOD_NAME, GetDeviceState::build);
    registry.register(get_coin_info::METHOD_NAME, GetCoinInfo::build);
    registry.register(ethereum::sign_typed_data::METHOD_NAME, EthereumSignTypedData::build);
    registry.register(firmware_update::METHOD_NAME, FirmwareUpdate::build);
    registry.register(request_login::METHOD_NAME, RequestLogin::build);
    registry.register(eos_get_public_key::METHOD_NAME, EosGetPublicKey::build);
    for name in lisk_deprecated::METHOD_NAMES {
        registry.register(name, LiskDeprecated::build);
    }
}
