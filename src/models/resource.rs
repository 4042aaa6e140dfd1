//! Account resources and event handles from the fullnode REST API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::u64_string;

/// Struct tag prefix of the standard coin store resource.
pub const COIN_STORE_STRUCT_TAG_PREFIX: &str = "0x1::coin::CoinStore<";
/// Struct tag of the legacy token store resource.
pub const TOKEN_STORE_STRUCT_TAG: &str = "0x3::token::TokenStore";

/// Reference to an append-only event stream. `counter` is the number of
/// events ever emitted; events exist at sequence numbers `[0, counter)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHandle {
    #[serde(with = "u64_string")]
    pub counter: u64,
    pub guid: EventHandleGuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHandleGuid {
    pub id: EventHandleId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHandleId {
    pub addr: String,
    #[serde(with = "u64_string")]
    pub creation_num: u64,
}

/// An untyped account resource; `data` is decoded on demand based on the
/// struct tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinValue {
    #[serde(with = "u64_string")]
    pub value: u64,
}

/// Data of a `0x1::coin::CoinStore<T>` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinStoreData {
    pub coin: CoinValue,
    pub frozen: bool,
    pub deposit_events: EventHandle,
    pub withdraw_events: EventHandle,
}

/// Data of a `0x3::token::TokenStore` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStoreData {
    pub deposit_events: EventHandle,
    pub withdraw_events: EventHandle,
    #[serde(default)]
    pub direct_transfer: bool,
}

/// Info for a coin type, from its `0x1::coin::CoinInfo<T>` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Fully-qualified coin type tag; filled in by the client since the
    /// resource payload itself does not repeat it.
    #[serde(default)]
    pub coin_type: String,
}

/// Extract every coin store held by an account, keyed by coin type.
///
/// Resources that carry a `CoinStore<T>` tag but fail to decode are skipped
/// with a warning rather than failing the whole discovery pass.
pub fn coin_stores_by_type(resources: &[AccountResource]) -> BTreeMap<String, CoinStoreData> {
    let mut stores = BTreeMap::new();
    for resource in resources {
        let Some(coin_type) = parse_coin_store_tag(&resource.resource_type) else {
            continue;
        };
        match serde_json::from_value::<CoinStoreData>(resource.data.clone()) {
            Ok(store) => {
                stores.insert(coin_type.to_string(), store);
            }
            Err(err) => {
                tracing::warn!(%coin_type, %err, "skipping undecodable coin store resource");
            }
        }
    }
    stores
}

/// Find the account's token store resource, if any.
pub fn token_store(resources: &[AccountResource]) -> Option<TokenStoreData> {
    resources
        .iter()
        .find(|r| r.resource_type == TOKEN_STORE_STRUCT_TAG)
        .and_then(|r| serde_json::from_value(r.data.clone()).ok())
}

fn parse_coin_store_tag(resource_type: &str) -> Option<&str> {
    resource_type
        .strip_prefix(COIN_STORE_STRUCT_TAG_PREFIX)?
        .strip_suffix('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin_store_json(counter: u64) -> serde_json::Value {
        serde_json::json!({
            "coin": { "value": "1000" },
            "frozen": false,
            "deposit_events": {
                "counter": counter.to_string(),
                "guid": { "id": { "addr": "0xa", "creation_num": "2" } },
            },
            "withdraw_events": {
                "counter": "0",
                "guid": { "id": { "addr": "0xa", "creation_num": "3" } },
            },
        })
    }

    #[test]
    fn extracts_coin_stores_by_coin_type() {
        let resources = vec![
            AccountResource {
                resource_type: "0x1::account::Account".to_string(),
                data: serde_json::json!({}),
            },
            AccountResource {
                resource_type: "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>".to_string(),
                data: coin_store_json(25),
            },
        ];

        let stores = coin_stores_by_type(&resources);
        assert_eq!(stores.len(), 1);
        let store = &stores["0x1::aptos_coin::AptosCoin"];
        assert_eq!(store.deposit_events.counter, 25);
        assert_eq!(store.deposit_events.guid.id.creation_num, 2);
    }

    #[test]
    fn nested_generic_coin_store_tags_keep_full_inner_type() {
        let tag = "0x1::coin::CoinStore<0xabc::lp::LP<0x1::aptos_coin::AptosCoin, 0xdef::usd::USDC>>";
        assert_eq!(
            parse_coin_store_tag(tag),
            Some("0xabc::lp::LP<0x1::aptos_coin::AptosCoin, 0xdef::usd::USDC>")
        );
    }
}
