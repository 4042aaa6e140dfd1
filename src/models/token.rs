//! Token identity and metadata models

use serde::{Deserialize, Serialize};

/// Identity of a token within a creator's collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenDataId {
    pub creator: String,
    pub collection: String,
    pub name: String,
}

impl TokenDataId {
    /// Composite cache key. Creator addresses cannot contain `::`, so the
    /// first two segments split unambiguously.
    pub fn key(&self) -> String {
        format!("{}::{}::{}", self.creator, self.collection, self.name)
    }
}

/// Token metadata as served by the token data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub creator: String,
    pub collection: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata_uri: String,
    #[serde(default)]
    pub amount: Option<u64>,
}

impl TokenData {
    pub fn id(&self) -> TokenDataId {
        TokenDataId {
            creator: self.creator.clone(),
            collection: self.collection.clone(),
            name: self.name.clone(),
        }
    }
}

/// Off-chain metadata JSON referenced by a token's `metadata_uri`. Schemas
/// vary wildly across collections, so unrecognized fields are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub animation_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "name": "Cat #1",
            "image": "ipfs://abc",
            "attributes": [{ "trait_type": "fur", "value": "orange" }],
        });
        let metadata: MetadataJson = serde_json::from_value(raw).unwrap();
        assert_eq!(metadata.name.as_deref(), Some("Cat #1"));
        assert!(metadata.extra.contains_key("attributes"));
    }
}
