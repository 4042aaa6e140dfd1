//! Per-network local cache of chain reads
//!
//! Everything stored here is re-derivable from the chain, which is what
//! makes the destructive schema-conflict recovery in [`rocksdb`] safe.

pub mod rocksdb;

pub use rocksdb::{NetworkCacheDb, Tables, TARGET_DB_VERSION};

use serde::{Deserialize, Serialize};

use crate::models::{MetadataJson, PendingTransaction, TokenData};

/// Per-instance metadata recording the schema version and the network the
/// cache belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheDbMeta {
    pub chain_id: u8,
    pub db_version: u32,
    pub node_url: String,
}

/// Address-to-name lookup result. `name == None` records a confirmed
/// "no name" answer so misses are not refetched within the TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAccount {
    pub address: String,
    pub name: Option<String>,
    /// Milliseconds since the epoch.
    pub updated_at: i64,
}

/// Name-to-address lookup result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedName {
    pub name: String,
    pub address: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTokenData {
    pub token: TokenData,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMetadataJson {
    pub metadata: MetadataJson,
    pub updated_at: i64,
}

/// A submitted transaction being tracked until it leaves pending state.
/// `timestamp` is the last time the record was written or revalidated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPendingTransaction {
    pub txn: PendingTransaction,
    pub timestamp: i64,
}
