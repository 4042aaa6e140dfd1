//! Data models for on-chain Aptos state consumed by the wallet cache

pub mod event;
pub mod resource;
pub mod token;
pub mod transaction;

pub use event::*;
pub use resource::*;
pub use token::*;
pub use transaction::*;

/// Serde helpers for u64 fields that the Aptos REST API encodes as JSON
/// strings (`"counter": "25"`).
pub mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u64>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "super::u64_string")]
        value: u64,
    }

    #[test]
    fn u64_string_round_trip() {
        let parsed: Wrapper = serde_json::from_str(r#"{"value":"1234"}"#).unwrap();
        assert_eq!(parsed, Wrapper { value: 1234 });
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"value":"1234"}"#);
    }

    #[test]
    fn u64_string_rejects_non_numeric() {
        let result: Result<Wrapper, _> = serde_json::from_str(r#"{"value":"abc"}"#);
        assert!(result.is_err());
    }
}
