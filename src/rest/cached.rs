//! Cache-backed [`RestApi`] facade
//!
//! Wraps an inner API with the local freshness policy: immutable chain
//! data (committed transactions, coin infos, events) is cached forever,
//! name lookups and token data carry TTLs, and pending transactions are
//! revalidated against the node until they commit or expire.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{Clock, RestApi, SystemClock};
use crate::config::SyncConfig;
use crate::database::{
    CachedAccount, CachedMetadataJson, CachedName, CachedPendingTransaction, CachedTokenData,
    NetworkCacheDb,
};
use crate::models::{
    AccountResource, CoinInfo, Event, MetadataJson, PendingTransaction, TokenData, TokenDataId,
    Transaction,
};

pub struct CachedRestApi<C> {
    inner: Arc<C>,
    db: NetworkCacheDb,
    sync: SyncConfig,
    clock: Arc<dyn Clock>,
}

impl<C: RestApi> CachedRestApi<C> {
    pub fn new(inner: Arc<C>, db: NetworkCacheDb, sync: SyncConfig) -> Self {
        Self::with_clock(inner, db, sync, Arc::new(SystemClock))
    }

    pub fn with_clock(
        inner: Arc<C>,
        db: NetworkCacheDb,
        sync: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            db,
            sync,
            clock,
        }
    }

    fn expired(&self, updated_at: i64, ttl_secs: u64) -> bool {
        self.clock.now_ms() - updated_at >= (ttl_secs as i64) * 1000
    }

    /// Record a freshly submitted transaction for tracking.
    pub fn add_pending_transaction(&self, txn: &PendingTransaction) -> Result<()> {
        self.db.put_pending_transaction(&CachedPendingTransaction {
            txn: txn.clone(),
            timestamp: self.clock.now_ms(),
        })
    }

    /// Pending transactions of a sender, revalidated against the node.
    ///
    /// Transactions found committed are dropped from the cache. Ones still
    /// pending get their timestamp refreshed to `min(now, expiration)` so a
    /// record never outruns the point past which it cannot commit. Expired
    /// records are returned as-is without touching the node.
    pub async fn get_pending_transactions(
        &self,
        sender: &str,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    ) -> Result<Vec<PendingTransaction>> {
        let cached = self.db.get_pending_transactions(sender, from_ms, to_ms)?;
        let now = self.clock.now_ms();
        let mut still_pending = Vec::new();
        for pending in cached {
            let expiration_ms = (pending.txn.expiration_timestamp_secs as i64).saturating_mul(1000);
            if pending.timestamp >= expiration_ms {
                still_pending.push(pending.txn);
                continue;
            }
            let committed = match self.inner.get_transaction_by_hash(&pending.txn.hash).await {
                Ok(txn) => !txn.is_pending(),
                Err(err) => {
                    debug!(hash = %pending.txn.hash, %err, "pending revalidation failed, keeping");
                    false
                }
            };
            if committed {
                self.db.delete_pending_transaction(&pending)?;
                continue;
            }
            let refreshed = CachedPendingTransaction {
                txn: pending.txn.clone(),
                timestamp: now.min(expiration_ms),
            };
            // The index entry is keyed by timestamp, so the record moves.
            self.db.delete_pending_transaction(&pending)?;
            self.db.put_pending_transaction(&refreshed)?;
            still_pending.push(refreshed.txn);
        }
        Ok(still_pending)
    }
}

#[async_trait]
impl<C: RestApi> RestApi for CachedRestApi<C> {
    async fn get_coin_info(&self, coin_type: &str) -> Result<CoinInfo> {
        if let Some(info) = self.db.get_coin_info(coin_type)? {
            return Ok(info);
        }
        let info = self.inner.get_coin_info(coin_type).await?;
        self.db.put_coin_info(coin_type, &info)?;
        Ok(info)
    }

    async fn get_transaction(&self, version: u64) -> Result<Transaction> {
        if let Some(txn) = self.db.get_transaction(version)? {
            return Ok(txn);
        }
        let txn = self.inner.get_transaction(version).await?;
        self.db.put_transaction(version, &txn)?;
        Ok(txn)
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        // Hash lookups are used to poll pending state, never cached.
        self.inner.get_transaction_by_hash(hash).await
    }

    /// Serve a window from cache where contiguous, fetch only the rest.
    ///
    /// The cached run is counted from the newest end of the window; a
    /// partial run shrinks the node fetch to `[start, start + limit - run)`.
    async fn get_events(
        &self,
        address: &str,
        creation_number: u64,
        start: u64,
        limit: u64,
    ) -> Result<Vec<Event>> {
        let end = start.saturating_add(limit);
        let mut cached = self.db.get_events(address, creation_number, start, end)?;
        cached.reverse();
        if cached.len() as u64 == limit {
            return Ok(cached);
        }

        let mut run = 0u64;
        for (i, event) in cached.iter().enumerate() {
            if event.sequence_number == end - 1 - i as u64 {
                run += 1;
            } else {
                break;
            }
        }

        let fresh = self
            .inner
            .get_events(address, creation_number, start, limit - run)
            .await?;
        self.db.put_events(address, creation_number, &fresh)?;

        let mut page: Vec<Event> = cached.into_iter().take(run as usize).collect();
        page.extend(fresh);
        Ok(page)
    }

    async fn get_account_resources(&self, address: &str) -> Result<Vec<AccountResource>> {
        // Balances and counters move constantly; always ask the node.
        self.inner.get_account_resources(address).await
    }

    async fn get_name_from_address(&self, address: &str) -> Result<Option<String>> {
        if let Some(cached) = self.db.get_account(address)? {
            if !self.expired(cached.updated_at, self.sync.name_ttl_secs) {
                return Ok(cached.name);
            }
        }
        let name = self.inner.get_name_from_address(address).await?;
        // A `None` answer is cached too so misses are not refetched.
        self.db.put_account(&CachedAccount {
            address: address.to_string(),
            name: name.clone(),
            updated_at: self.clock.now_ms(),
        })?;
        Ok(name)
    }

    async fn get_address_from_name(&self, name: &str) -> Result<Option<String>> {
        if let Some(cached) = self.db.get_name(name)? {
            if !self.expired(cached.updated_at, self.sync.name_ttl_secs) {
                return Ok(Some(cached.address));
            }
        }
        let address = self.inner.get_address_from_name(name).await?;
        if let Some(address) = &address {
            self.db.put_name(&CachedName {
                name: name.to_string(),
                address: address.clone(),
                updated_at: self.clock.now_ms(),
            })?;
        }
        Ok(address)
    }

    async fn get_token_data(&self, id: &TokenDataId) -> Result<TokenData> {
        let key = id.key();
        if let Some(cached) = self.db.get_token_data(&key)? {
            if !self.expired(cached.updated_at, self.sync.token_data_ttl_secs) {
                return Ok(cached.token);
            }
        }
        let token = self.inner.get_token_data(id).await?;
        self.db.put_token_data(
            &key,
            &CachedTokenData {
                token: token.clone(),
                updated_at: self.clock.now_ms(),
            },
        )?;
        Ok(token)
    }

    async fn get_token_metadata(&self, uri: &str) -> Result<MetadataJson> {
        if let Some(cached) = self.db.get_token_metadata(uri)? {
            if !self.expired(cached.updated_at, self.sync.token_metadata_ttl_secs) {
                return Ok(cached.metadata);
            }
        }
        let metadata = self.inner.get_token_metadata(uri).await?;
        self.db.put_token_metadata(
            uri,
            &CachedMetadataJson {
                metadata: metadata.clone(),
                updated_at: self.clock.now_ms(),
            },
        )?;
        Ok(metadata)
    }
}
