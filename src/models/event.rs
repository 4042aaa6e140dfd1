//! Raw on-chain events as returned by the fullnode REST API

use serde::{Deserialize, Serialize};

use super::token::TokenDataId;
use super::u64_string;

/// Event type tag for coin deposits.
pub const COIN_DEPOSIT_EVENT_TYPE: &str = "0x1::coin::DepositEvent";
/// Event type tag for coin withdrawals.
pub const COIN_WITHDRAW_EVENT_TYPE: &str = "0x1::coin::WithdrawEvent";

/// Identity of the event stream an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGuid {
    #[serde(with = "u64_string")]
    pub creation_number: u64,
    pub account_address: String,
}

/// A single append-only on-chain notification. Immutable once emitted;
/// ordered globally by `version` and per-handle by `sequence_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(with = "u64_string")]
    pub version: u64,
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    pub guid: EventGuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

impl Event {
    /// Whether this is one of the standard coin store events.
    pub fn is_coin_event(&self) -> bool {
        self.event_type == COIN_DEPOSIT_EVENT_TYPE || self.event_type == COIN_WITHDRAW_EVENT_TYPE
    }

    /// Decode the payload of a coin deposit/withdraw event.
    pub fn coin_data(&self) -> Option<CoinEventData> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Decode the payload of a token store deposit/withdraw event.
    pub fn token_data(&self) -> Option<TokenEventData> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Payload of `0x1::coin::DepositEvent` / `0x1::coin::WithdrawEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinEventData {
    #[serde(with = "u64_string")]
    pub amount: u64,
}

/// Payload of `0x3::token::DepositEvent` / `0x3::token::WithdrawEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEventData {
    pub id: TokenEventId,
    #[serde(with = "u64_string")]
    pub amount: u64,
}

/// Token identity carried by token store events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEventId {
    pub token_data_id: TokenDataId,
    #[serde(with = "u64_string", default)]
    pub property_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coin_event_from_node_json() {
        let raw = serde_json::json!({
            "version": "4980001",
            "sequence_number": "18",
            "guid": { "creation_number": "2", "account_address": "0xbf3c" },
            "type": "0x1::coin::DepositEvent",
            "data": { "amount": "2440000" },
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert!(event.is_coin_event());
        assert_eq!(event.version, 4980001);
        assert_eq!(event.guid.creation_number, 2);
        assert_eq!(event.coin_data().unwrap().amount, 2440000);
    }

    #[test]
    fn parses_token_event_payload() {
        let raw = serde_json::json!({
            "version": "100",
            "sequence_number": "0",
            "guid": { "creation_number": "4", "account_address": "0xa" },
            "type": "0x3::token::DepositEvent",
            "data": {
                "id": {
                    "token_data_id": {
                        "creator": "0xc",
                        "collection": "Cool Cats",
                        "name": "Cat #1",
                    },
                    "property_version": "0",
                },
                "amount": "1",
            },
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert!(!event.is_coin_event());
        let data = event.token_data().unwrap();
        assert_eq!(data.id.token_data_id.key(), "0xc::Cool Cats::Cat #1");
        assert_eq!(data.amount, 1);
    }
}
