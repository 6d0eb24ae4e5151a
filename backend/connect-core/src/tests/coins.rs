use crate::coins::{CoinTable, network_label};

use models::CoinType;

#[test]
fn given_bundled_table_when_looked_up_then_case_insensitive_by_shortcut_or_name() {
    let coins = CoinTable::bundled().unwrap();

    assert_eq!(coins.get("btc").map(|c| c.shortcut.as_str()), Some("BTC"));
    assert_eq!(coins.get("bitcoin").map(|c| c.shortcut.as_str()), Some("BTC"));
    assert!(coins.get("doge").is_none());
}

#[test]
fn given_unknown_coin_when_required_then_unknown_coin_error() {
    let coins = CoinTable::bundled().unwrap();

    let err = coins.require("doge").unwrap_err();

    assert_eq!(err.code(), "Method_UnknownCoin");
    assert_eq!(err.message(), "Coin not found.");
}

#[test]
fn given_slip44_when_ethereum_lookup_then_only_ethereum_networks_match() {
    let coins = CoinTable::bundled().unwrap();

    let eth = coins.ethereum_network_by_slip44(60).unwrap();
    assert_eq!(eth.coin_type, CoinType::Ethereum);
    assert_eq!(eth.chain_id, Some(1));

    // slip44 0 is Bitcoin, not an ethereum network
    assert!(coins.ethereum_network_by_slip44(0).is_none());
    assert_eq!(
        coins.ethereum_network_by_chain_id(61).map(|c| c.shortcut.as_str()),
        Some("ETC")
    );
    assert_eq!(
        coins.misc_coin_by_slip44(194).map(|c| c.shortcut.as_str()),
        Some("EOS")
    );
}

#[test]
fn given_network_when_label_built_then_placeholder_replaced() {
    let coins = CoinTable::bundled().unwrap();

    assert_eq!(
        network_label("Sign #NETWORK typed data", coins.get("ETH")),
        "Sign Ethereum typed data"
    );
    assert_eq!(
        network_label("Sign #NETWORK typed data", coins.get("tGOR")),
        "Sign Testnet typed data"
    );
    assert_eq!(network_label("Sign #NETWORK typed data", None), "Sign  typed data");
}

#[test]
fn given_malformed_json_when_table_parsed_then_config_error() {
    assert!(CoinTable::from_json("{ not json").is_err());
}
