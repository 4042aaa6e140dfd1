//! REST access to the fullnode and companion APIs
//!
//! [`NodeClient`] talks to the network; [`CachedRestApi`] wraps any
//! [`RestApi`] with the local cache policy. Providers and the activity
//! layer only ever see the trait.

pub mod cached;
pub mod client;
pub mod error;

pub use cached::CachedRestApi;
pub use client::NodeClient;
pub use error::RestError;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    AccountResource, CoinInfo, Event, MetadataJson, TokenData, TokenDataId, Transaction,
};

/// Read operations against the chain and its companion services.
#[async_trait]
pub trait RestApi: Send + Sync {
    /// Info for a coin type, e.g. `0x1::aptos_coin::AptosCoin`.
    async fn get_coin_info(&self, coin_type: &str) -> Result<CoinInfo>;

    /// A committed transaction by ledger version.
    async fn get_transaction(&self, version: u64) -> Result<Transaction>;

    /// A transaction by hash; may still be pending.
    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction>;

    /// Events of a handle with sequence numbers in `[start, start + limit)`,
    /// newest first. A full page has exactly `limit` events; anything
    /// shorter means the handle holds fewer events than its counter claims.
    async fn get_events(
        &self,
        address: &str,
        creation_number: u64,
        start: u64,
        limit: u64,
    ) -> Result<Vec<Event>>;

    /// All resources currently held by an account.
    async fn get_account_resources(&self, address: &str) -> Result<Vec<AccountResource>>;

    /// Primary registered name for an address, if any.
    async fn get_name_from_address(&self, address: &str) -> Result<Option<String>>;

    /// Address a name resolves to, if registered.
    async fn get_address_from_name(&self, name: &str) -> Result<Option<String>>;

    /// Token data from the token API.
    async fn get_token_data(&self, id: &TokenDataId) -> Result<TokenData>;

    /// Off-chain metadata JSON referenced by a token's URI.
    async fn get_token_metadata(&self, uri: &str) -> Result<MetadataJson>;
}

/// Wall-clock source, injectable so freshness policies are testable.
pub trait Clock: Send + Sync {
    /// Milliseconds since the epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
