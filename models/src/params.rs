//! Parameters every call accepts next to its method-specific fields.

use serde::{Deserialize, Serialize};

/// Which device (and which wallet on it) a call targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelector {
    pub path: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub instance: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonParams {
    #[serde(default)]
    pub device: Option<DeviceSelector>,
    #[serde(default)]
    pub use_empty_passphrase: bool,
    #[serde(default)]
    pub allow_seedless_device: bool,
    #[serde(default)]
    pub keep_session: bool,
    #[serde(default)]
    pub skip_final_reload: bool,
    #[serde(default)]
    pub use_cardano_derivation: bool,
}
