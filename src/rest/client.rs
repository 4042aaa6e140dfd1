//! HTTP client for the fullnode and companion APIs

use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::error::RestError;
use super::RestApi;
use crate::config::NodeConfig;
use crate::models::{
    AccountResource, CoinInfo, Event, MetadataJson, TokenData, TokenDataId, Transaction,
};

/// Error payload returned by the fullnode on non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct NodeErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: String,
}

#[derive(Debug, Deserialize)]
struct LedgerInfo {
    chain_id: u8,
}

#[derive(Debug, Default, Deserialize)]
struct NameRecord {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressRecord {
    #[serde(default)]
    address: Option<String>,
}

/// Direct (uncached) REST client. Wrap in
/// [`CachedRestApi`](super::CachedRestApi) for normal use.
pub struct NodeClient {
    http: reqwest::Client,
    node_url: Url,
    name_api_url: Url,
    token_api_url: Url,
}

impl NodeClient {
    pub fn new(config: &NodeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            node_url: Url::parse(&config.node_url)?,
            name_api_url: Url::parse(&config.name_api_url)?,
            token_api_url: Url::parse(&config.token_api_url)?,
        })
    }

    /// Chain id of the network the node serves, used to key the local cache.
    pub async fn get_chain_id(&self) -> Result<u8> {
        let info: LedgerInfo = self.get_json(self.node_url.clone()).await?;
        Ok(info.chain_id)
    }

    fn url_with(&self, base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| RestError::Http(format!("cannot extend base url {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "rest request");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| RestError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body: NodeErrorBody = response.json().await.unwrap_or_default();
            return Err(
                RestError::from_node_error(status.as_u16(), body.error_code, body.message).into(),
            );
        }
        response
            .json()
            .await
            .map_err(|err| RestError::Json(err.to_string()).into())
    }

    /// Like [`get_json`](Self::get_json) but maps 404 to `None`.
    async fn get_json_opt<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        match self.get_json(url).await {
            Ok(value) => Ok(Some(value)),
            Err(err) => match err.downcast_ref::<RestError>() {
                Some(RestError::NotFound(_)) => Ok(None),
                _ => Err(err),
            },
        }
    }
}

#[async_trait::async_trait]
impl RestApi for NodeClient {
    async fn get_coin_info(&self, coin_type: &str) -> Result<CoinInfo> {
        // CoinInfo<T> lives on the account that published T.
        let account = coin_type
            .split("::")
            .next()
            .ok_or_else(|| RestError::Json(format!("malformed coin type {coin_type}")))?;
        let tag = format!("0x1::coin::CoinInfo<{coin_type}>");
        let url = self.url_with(&self.node_url, &["accounts", account, "resource", &tag])?;
        let resource: AccountResource = self.get_json(url).await?;
        let mut info: CoinInfo = serde_json::from_value(resource.data)
            .map_err(|err| RestError::Json(err.to_string()))?;
        info.coin_type = coin_type.to_string();
        Ok(info)
    }

    async fn get_transaction(&self, version: u64) -> Result<Transaction> {
        let url = self.url_with(
            &self.node_url,
            &["transactions", "by_version", &version.to_string()],
        )?;
        self.get_json(url).await
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        let url = self.url_with(&self.node_url, &["transactions", "by_hash", hash])?;
        self.get_json(url).await
    }

    async fn get_events(
        &self,
        address: &str,
        creation_number: u64,
        start: u64,
        limit: u64,
    ) -> Result<Vec<Event>> {
        let mut url = self.url_with(
            &self.node_url,
            &["accounts", address, "events", &creation_number.to_string()],
        )?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("limit", &limit.to_string());
        let mut events: Vec<Event> = self.get_json(url).await?;
        // The node pages in ascending sequence order; callers consume
        // newest first.
        events.reverse();
        Ok(events)
    }

    async fn get_account_resources(&self, address: &str) -> Result<Vec<AccountResource>> {
        let url = self.url_with(&self.node_url, &["accounts", address, "resources"])?;
        self.get_json(url).await
    }

    async fn get_name_from_address(&self, address: &str) -> Result<Option<String>> {
        let url = self.url_with(&self.name_api_url, &["v1", "primary-name", address])?;
        let record: Option<NameRecord> = self.get_json_opt(url).await?;
        Ok(record.and_then(|r| r.name).filter(|n| !n.is_empty()))
    }

    async fn get_address_from_name(&self, name: &str) -> Result<Option<String>> {
        let url = self.url_with(&self.name_api_url, &["v1", "address", name])?;
        let record: Option<AddressRecord> = self.get_json_opt(url).await?;
        Ok(record.and_then(|r| r.address).filter(|a| !a.is_empty()))
    }

    async fn get_token_data(&self, id: &TokenDataId) -> Result<TokenData> {
        let url = self.url_with(
            &self.token_api_url,
            &["token", &id.creator, &id.collection, &id.name],
        )?;
        self.get_json(url).await
    }

    async fn get_token_metadata(&self, uri: &str) -> Result<MetadataJson> {
        let url = Url::parse(&rewrite_ipfs_uri(uri))
            .map_err(|err| RestError::Json(format!("bad metadata uri {uri}: {err}")))?;
        self.get_json(url).await
    }
}

/// Rewrite `ipfs://` URIs to a public gateway so they are fetchable over
/// plain HTTP.
fn rewrite_ipfs_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(path) => format!("https://ipfs.io/ipfs/{path}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_ipfs_uris() {
        assert_eq!(
            rewrite_ipfs_uri("ipfs://Qmabc/1.json"),
            "https://ipfs.io/ipfs/Qmabc/1.json"
        );
        assert_eq!(
            rewrite_ipfs_uri("https://example.com/1.json"),
            "https://example.com/1.json"
        );
    }

    #[test]
    fn builds_urls_under_versioned_base_path() {
        let config = NodeConfig::default();
        let client = NodeClient::new(&config).unwrap();
        let url = client
            .url_with(&client.node_url, &["transactions", "by_version", "42"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://fullnode.mainnet.aptoslabs.com/v1/transactions/by_version/42"
        );
    }

    #[test]
    fn url_segments_are_percent_encoded() {
        let config = NodeConfig::default();
        let client = NodeClient::new(&config).unwrap();
        let url = client
            .url_with(&client.token_api_url, &["token", "0xc", "Cool Cats", "Cat #1"])
            .unwrap();
        assert!(url.as_str().ends_with("/token/0xc/Cool%20Cats/Cat%20%231"));
    }
}
