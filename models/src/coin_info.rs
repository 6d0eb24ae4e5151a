//! Static coin records as shipped in the coin tables.

use crate::FirmwareVersion;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Bitcoin,
    Ethereum,
    Misc,
}

impl CoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "bitcoin",
            CoinType::Ethereum => "ethereum",
            CoinType::Misc => "misc",
        }
    }
}

/// Minimum firmware per generation. `None` means the coin is not supported
/// on that generation at all (`false` in the tables).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSupport {
    #[serde(default, deserialize_with = "support_version")]
    pub trezor1: Option<FirmwareVersion>,
    #[serde(default, deserialize_with = "support_version")]
    pub trezor2: Option<FirmwareVersion>,
}

impl CoinSupport {
    pub fn for_major(&self, major_version: u32) -> Option<&FirmwareVersion> {
        match major_version {
            1 => self.trezor1.as_ref(),
            2 => self.trezor2.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    #[serde(rename = "type")]
    pub coin_type: CoinType,
    pub name: String,
    pub shortcut: String,
    pub slip44: u32,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u32>,
    #[serde(default)]
    pub support: CoinSupport,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSupport {
    Flag(bool),
    Version(String),
}

fn support_version<'de, D>(deserializer: D) -> Result<Option<FirmwareVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawSupport>::deserialize(deserializer)? {
        None | Some(RawSupport::Flag(false)) => Ok(None),
        Some(RawSupport::Flag(true)) => Err(serde::de::Error::custom(
            "support must be a version string or false",
        )),
        Some(RawSupport::Version(raw)) => FirmwareVersion::parse(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
