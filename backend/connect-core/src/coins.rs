//! Static coin lookup table.

use crate::error::config::ConfigError;
use crate::error::ConnectError;

use common::ErrorLocation;
use models::{CoinInfo, CoinType};

use std::panic::Location;

const COINS_TABLE_NAME: &str = "coins.json";
const BUNDLED_COINS_JSON: &str = include_str!("../data/coins.json");

#[derive(Debug, Clone, Default)]
pub struct CoinTable {
    coins: Vec<CoinInfo>,
}

impl CoinTable {
    pub fn new(coins: Vec<CoinInfo>) -> Self {
        Self { coins }
    }

    #[track_caller]
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_json(BUNDLED_COINS_JSON)
    }

    #[track_caller]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let coins: Vec<CoinInfo> =
            serde_json::from_str(json).map_err(|e| ConfigError::BundledTable {
                location: ErrorLocation::from(Location::caller()),
                table: COINS_TABLE_NAME,
                reason: e.to_string(),
            })?;
        Ok(Self::new(coins))
    }

    /// Case-insensitive lookup by shortcut or name.
    pub fn get(&self, coin: &str) -> Option<&CoinInfo> {
        self.coins.iter().find(|info| {
            info.shortcut.eq_ignore_ascii_case(coin) || info.name.eq_ignore_ascii_case(coin)
        })
    }

    /// Like [`CoinTable::get`] but a miss is `Method_UnknownCoin`.
    #[track_caller]
    pub fn require(&self, coin: &str) -> Result<&CoinInfo, ConnectError> {
        self.get(coin).ok_or_else(|| ConnectError::UnknownCoin {
            message: "Coin not found.".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    pub fn ethereum_network_by_slip44(&self, slip44: u32) -> Option<&CoinInfo> {
        self.coins
            .iter()
            .find(|info| info.coin_type == CoinType::Ethereum && info.slip44 == slip44)
    }

    pub fn ethereum_network_by_chain_id(&self, chain_id: u64) -> Option<&CoinInfo> {
        self.coins
            .iter()
            .find(|info| info.coin_type == CoinType::Ethereum && info.chain_id == Some(chain_id))
    }

    pub fn misc_coin_by_slip44(&self, slip44: u32) -> Option<&CoinInfo> {
        self.coins
            .iter()
            .find(|info| info.coin_type == CoinType::Misc && info.slip44 == slip44)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// Replace `#NETWORK` in an operation label.
///
/// Testnets collapse to `"Testnet"`; no network removes the placeholder.
pub fn network_label(label: &str, network: Option<&CoinInfo>) -> String {
    match network {
        Some(info) => {
            let name = if info.name.to_lowercase().contains("testnet") {
                "Testnet"
            } else {
                info.name.as_str()
            };
            label.replace("#NETWORK", name)
        }
        None => label.replace("#NETWORK", ""),
    }
}
