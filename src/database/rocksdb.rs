//! RocksDB-backed per-network cache store with schema migration
//!
//! One database instance per `(chain id, node url)` pair, one column family
//! per logical table. Migrations are additive: each schema version only
//! ever introduces new column families. The single destructive path is a
//! hard version conflict, where the whole instance is deleted and rebuilt
//! (cached chain data is always re-derivable).

use anyhow::{anyhow, Result};
use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    CacheDbMeta, CachedAccount, CachedMetadataJson, CachedName, CachedPendingTransaction,
    CachedTokenData,
};
use crate::config::CacheConfig;
use crate::models::{CoinInfo, Event, Transaction};

/// Type alias for the RocksDB instance
pub type RocksDb = DBWithThreadMode<MultiThreaded>;

/// Schema version new instances are created at.
pub const TARGET_DB_VERSION: u32 = 4;

const META_RECORD_KEY: &[u8] = b"schema";

/// Column family names for the cache tables
pub struct Tables;

impl Tables {
    pub const TRANSACTIONS: &'static str = "transactions";
    pub const EVENTS: &'static str = "events";
    pub const COINS: &'static str = "coins";
    pub const ACCOUNTS: &'static str = "accounts";
    pub const NAMES: &'static str = "names";
    pub const PENDING_TRANSACTIONS: &'static str = "pending_transactions";
    pub const PENDING_BY_TIMESTAMP: &'static str = "pending_by_timestamp";
    pub const TOKEN_DATA: &'static str = "token_data";
    pub const TOKEN_METADATA: &'static str = "token_metadata";
    pub const META: &'static str = "meta";

    /// All table names at the target schema version
    pub fn all() -> Vec<&'static str> {
        let mut tables = vec![Self::META];
        for version in 1..=TARGET_DB_VERSION {
            tables.extend(Self::introduced_at(version));
        }
        tables
    }

    /// Tables introduced by a given schema version increment.
    pub fn introduced_at(version: u32) -> &'static [&'static str] {
        match version {
            1 => &[Self::TRANSACTIONS, Self::EVENTS, Self::COINS],
            2 => &[Self::ACCOUNTS, Self::NAMES],
            3 => &[Self::PENDING_TRANSACTIONS, Self::PENDING_BY_TIMESTAMP],
            4 => &[Self::TOKEN_DATA, Self::TOKEN_METADATA],
            _ => &[],
        }
    }
}

/// Hard schema conflict: the stored version is ahead of what this build
/// understands, or the instance metadata is unreadable.
#[derive(Debug, Error)]
#[error("cache schema conflict: {0}")]
pub struct SchemaConflict(String);

/// Per-network cache store
#[derive(Clone)]
pub struct NetworkCacheDb {
    db: Arc<RocksDb>,
    path: PathBuf,
}

impl NetworkCacheDb {
    /// Open (creating or migrating as needed) the cache instance for the
    /// given network. On a hard version conflict the instance is deleted
    /// and recreated from scratch.
    pub fn open(config: &CacheConfig, node_url: &str, chain_id: u8) -> Result<Self> {
        Self::open_with_target(config, node_url, chain_id, TARGET_DB_VERSION)
    }

    pub(crate) fn open_with_target(
        config: &CacheConfig,
        node_url: &str,
        chain_id: u8,
        target_version: u32,
    ) -> Result<Self> {
        let path = Self::instance_path(config, node_url, chain_id);
        match Self::open_at(config, &path, node_url, chain_id, target_version) {
            Ok(db) => Ok(db),
            Err(err) if err.is::<SchemaConflict>() => {
                warn!(path = %path.display(), %err, "resetting cache instance");
                Self::destroy(&path)?;
                Self::open_at(config, &path, node_url, chain_id, target_version)
            }
            Err(err) => Err(err),
        }
    }

    /// Deterministic instance directory for a network.
    pub fn instance_path(config: &CacheConfig, node_url: &str, chain_id: u8) -> PathBuf {
        let sanitized: String = node_url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        config.path.join(format!("restcache_{chain_id}_{sanitized}"))
    }

    /// Delete a cache instance in its entirety.
    pub fn destroy(path: &Path) -> Result<()> {
        RocksDb::destroy(&Options::default(), path)
            .map_err(|e| anyhow!("failed to destroy cache at {}: {e}", path.display()))?;
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn open_at(
        config: &CacheConfig,
        path: &Path,
        node_url: &str,
        chain_id: u8,
        target_version: u32,
    ) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.max_write_buffer_number);
        if config.enable_compression {
            db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        // Open with whatever column families already exist; migration
        // creates the missing ones explicitly.
        let existing = RocksDb::list_cf(&db_opts, path).unwrap_or_else(|_| vec!["default".into()]);
        let is_new = existing.len() <= 1;
        let cf_descriptors: Vec<ColumnFamilyDescriptor> = existing
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Self::cf_options(config)))
            .collect();
        let db = RocksDb::open_cf_descriptors(&db_opts, path, cf_descriptors)
            .map_err(|e| anyhow!("failed to open cache db: {e}"))?;
        let store = Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        };

        if store.db.cf_handle(Tables::META).is_none() {
            store.db.create_cf(Tables::META, &Self::cf_options(config))?;
        }

        let current_version = match store.get::<CacheDbMeta>(Tables::META, META_RECORD_KEY)? {
            Some(meta) if meta.db_version > target_version => {
                return Err(SchemaConflict(format!(
                    "stored version {} is ahead of target {target_version}",
                    meta.db_version
                ))
                .into());
            }
            Some(meta) => meta.db_version,
            // A populated instance without readable metadata cannot be
            // migrated safely.
            None if !is_new => {
                return Err(SchemaConflict("missing schema metadata".to_string()).into());
            }
            None => 0,
        };

        store.migrate(config, current_version, target_version)?;
        store.put(
            Tables::META,
            META_RECORD_KEY,
            &CacheDbMeta {
                chain_id,
                db_version: target_version,
                node_url: node_url.to_string(),
            },
        )?;
        Ok(store)
    }

    /// Apply additive migration steps from `from` (exclusive) to `to`
    /// (inclusive). Never drops existing data.
    fn migrate(&self, config: &CacheConfig, from: u32, to: u32) -> Result<()> {
        for version in (from + 1)..=to {
            for table in Tables::introduced_at(version) {
                if self.db.cf_handle(table).is_none() {
                    self.db.create_cf(table, &Self::cf_options(config))?;
                }
            }
            info!(version, path = %self.path.display(), "applied cache schema migration");
        }
        Ok(())
    }

    fn cf_options(config: &CacheConfig) -> Options {
        let mut cf_opts = Options::default();
        if config.enable_compression {
            cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }
        cf_opts
    }

    fn cf(&self, name: &str) -> Result<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| anyhow!("table '{name}' not found"))
    }

    /// Get and deserialize a value from a table
    pub fn get<T: DeserializeOwned>(&self, table: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(table)?;
        match self.db.get_cf(&cf, key)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value in a table
    pub fn put<T: Serialize>(&self, table: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(table)?;
        self.db.put_cf(&cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// Delete a key from a table
    pub fn delete(&self, table: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(table)?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }

    /// Ordered range scan over `[lower, upper]` or `[lower, upper)`.
    pub fn get_range<T: DeserializeOwned>(
        &self,
        table: &str,
        lower: &[u8],
        upper: &[u8],
        upper_inclusive: bool,
    ) -> Result<Vec<(Vec<u8>, T)>> {
        let cf = self.cf(table)?;
        let iter = self
            .db
            .iterator_cf(&cf, rocksdb::IteratorMode::From(lower, rocksdb::Direction::Forward));

        let mut results = Vec::new();
        for entry in iter {
            let (key, value) = entry?;
            let in_range = if upper_inclusive {
                key.as_ref() <= upper
            } else {
                key.as_ref() < upper
            };
            if !in_range {
                break;
            }
            results.push((key.into_vec(), serde_json::from_slice(&value)?));
        }
        Ok(results)
    }

    /// Create a write batch for atomic multi-key writes
    pub fn create_batch(&self) -> CacheBatch {
        CacheBatch {
            batch: WriteBatch::default(),
            store: self.clone(),
        }
    }
}

/// Atomic write batch over cache tables
pub struct CacheBatch {
    batch: WriteBatch,
    store: NetworkCacheDb,
}

impl CacheBatch {
    pub fn put<T: Serialize>(&mut self, table: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.store.cf(table)?;
        self.batch.put_cf(&cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    pub fn delete(&mut self, table: &str, key: &[u8]) -> Result<()> {
        let cf = self.store.cf(table)?;
        self.batch.delete_cf(&cf, key);
        Ok(())
    }

    /// Commit the batch atomically
    pub fn write(self) -> Result<()> {
        self.store.db.write(self.batch)?;
        Ok(())
    }
}

// Key encodings. Composite keys use big-endian integers so lexicographic
// order matches logical order and range scans double as index lookups.

/// Key of an event within the events table.
pub fn event_key(address: &str, creation_number: u64, sequence_number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(address.len() + 17);
    key.extend_from_slice(address.as_bytes());
    key.push(0);
    key.extend_from_slice(&creation_number.to_be_bytes());
    key.extend_from_slice(&sequence_number.to_be_bytes());
    key
}

/// Key of a pending-transaction index entry.
pub fn pending_index_key(sender: &str, timestamp_ms: i64, hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(sender.len() + hash.len() + 10);
    key.extend_from_slice(sender.as_bytes());
    key.push(0);
    key.extend_from_slice(&(timestamp_ms.max(0) as u64).to_be_bytes());
    key.push(0);
    key.extend_from_slice(hash.as_bytes());
    key
}

// Convenience methods for specific tables
impl NetworkCacheDb {
    /// Get a cached transaction by version
    pub fn get_transaction(&self, version: u64) -> Result<Option<Transaction>> {
        self.get(Tables::TRANSACTIONS, &version.to_be_bytes())
    }

    /// Store a transaction by version
    pub fn put_transaction(&self, version: u64, txn: &Transaction) -> Result<()> {
        self.put(Tables::TRANSACTIONS, &version.to_be_bytes(), txn)
    }

    /// Get cached coin info
    pub fn get_coin_info(&self, coin_type: &str) -> Result<Option<CoinInfo>> {
        self.get(Tables::COINS, coin_type.as_bytes())
    }

    /// Store coin info
    pub fn put_coin_info(&self, coin_type: &str, info: &CoinInfo) -> Result<()> {
        self.put(Tables::COINS, coin_type.as_bytes(), info)
    }

    /// Cached events of a handle with sequence numbers in `[start, end)`,
    /// in ascending sequence order. Gaps are the caller's concern.
    pub fn get_events(
        &self,
        address: &str,
        creation_number: u64,
        start: u64,
        end: u64,
    ) -> Result<Vec<Event>> {
        let lower = event_key(address, creation_number, start);
        let upper = event_key(address, creation_number, end);
        let entries = self.get_range::<Event>(Tables::EVENTS, &lower, &upper, false)?;
        Ok(entries.into_iter().map(|(_, event)| event).collect())
    }

    /// Store a page of events atomically
    pub fn put_events(&self, address: &str, creation_number: u64, events: &[Event]) -> Result<()> {
        let mut batch = self.create_batch();
        for event in events {
            let key = event_key(address, creation_number, event.sequence_number);
            batch.put(Tables::EVENTS, &key, event)?;
        }
        batch.write()
    }

    pub fn get_account(&self, address: &str) -> Result<Option<CachedAccount>> {
        self.get(Tables::ACCOUNTS, address.as_bytes())
    }

    pub fn put_account(&self, account: &CachedAccount) -> Result<()> {
        self.put(Tables::ACCOUNTS, account.address.as_bytes(), account)
    }

    pub fn get_name(&self, name: &str) -> Result<Option<CachedName>> {
        self.get(Tables::NAMES, name.as_bytes())
    }

    pub fn put_name(&self, name: &CachedName) -> Result<()> {
        self.put(Tables::NAMES, name.name.as_bytes(), name)
    }

    pub fn get_token_data(&self, token_key: &str) -> Result<Option<CachedTokenData>> {
        self.get(Tables::TOKEN_DATA, token_key.as_bytes())
    }

    pub fn put_token_data(&self, token_key: &str, data: &CachedTokenData) -> Result<()> {
        self.put(Tables::TOKEN_DATA, token_key.as_bytes(), data)
    }

    pub fn get_token_metadata(&self, uri: &str) -> Result<Option<CachedMetadataJson>> {
        self.get(Tables::TOKEN_METADATA, uri.as_bytes())
    }

    pub fn put_token_metadata(&self, uri: &str, metadata: &CachedMetadataJson) -> Result<()> {
        self.put(Tables::TOKEN_METADATA, uri.as_bytes(), metadata)
    }

    /// Store a pending transaction and its timestamp index entry
    pub fn put_pending_transaction(&self, pending: &CachedPendingTransaction) -> Result<()> {
        let mut batch = self.create_batch();
        batch.put(
            Tables::PENDING_TRANSACTIONS,
            pending.txn.hash.as_bytes(),
            pending,
        )?;
        let index_key = pending_index_key(&pending.txn.sender, pending.timestamp, &pending.txn.hash);
        batch.put(Tables::PENDING_BY_TIMESTAMP, &index_key, &pending.txn.hash)?;
        batch.write()
    }

    /// Remove a pending transaction and its index entry
    pub fn delete_pending_transaction(&self, pending: &CachedPendingTransaction) -> Result<()> {
        let mut batch = self.create_batch();
        batch.delete(Tables::PENDING_TRANSACTIONS, pending.txn.hash.as_bytes())?;
        let index_key = pending_index_key(&pending.txn.sender, pending.timestamp, &pending.txn.hash);
        batch.delete(Tables::PENDING_BY_TIMESTAMP, &index_key)?;
        batch.write()
    }

    /// Pending transactions of a sender in the given timestamp window.
    /// The upper bound is exclusive only when both bounds are given and
    /// differ, mirroring the caller's paging convention.
    pub fn get_pending_transactions(
        &self,
        sender: &str,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    ) -> Result<Vec<CachedPendingTransaction>> {
        let upper_exclusive = matches!((from_ms, to_ms), (Some(f), Some(t)) if f != t);
        let lower = pending_index_key(sender, from_ms.unwrap_or(0), "");
        let mut upper = match to_ms {
            Some(to) => pending_index_key(sender, to, ""),
            None => pending_index_key(sender, i64::MAX, ""),
        };
        if !upper_exclusive {
            // Make the hash suffix range-inclusive by bumping past every
            // possible key at the upper timestamp.
            upper.extend_from_slice(&[0xff; 33]);
        }

        let hashes = self.get_range::<String>(
            Tables::PENDING_BY_TIMESTAMP,
            &lower,
            &upper,
            !upper_exclusive,
        )?;
        let mut pending = Vec::with_capacity(hashes.len());
        for (_, hash) in hashes {
            if let Some(txn) =
                self.get::<CachedPendingTransaction>(Tables::PENDING_TRANSACTIONS, hash.as_bytes())?
            {
                pending.push(txn);
            }
        }
        Ok(pending)
    }
}
