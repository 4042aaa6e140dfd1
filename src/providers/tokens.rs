//! Inference of currently-owned tokens from token store history
//!
//! The legacy token store has no "list my tokens" read, only deposit and
//! withdraw event streams. Walking both backward while keeping a running
//! balance per token lets ownership fall out: the first time a token's
//! balance goes positive (seen from the present), the account still holds
//! it.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join_all;
use tracing::debug;

use super::event::EventProvider;
use crate::models::{token_store, TokenData, TokenDataId};
use crate::rest::RestApi;

pub struct TokenProvider<A> {
    api: Arc<A>,
    deposits: EventProvider<A>,
    withdrawals: EventProvider<A>,
    /// Running balance per token key, accumulated backward. Positive means
    /// ownership was confirmed; such tokens take no further updates.
    balances: BTreeMap<String, i64>,
    /// Tokens confirmed owned, newest acquisition first, not yet handed out.
    confirmed: Vec<TokenDataId>,
    done: bool,
}

impl<A: RestApi> TokenProvider<A> {
    /// Set up the walk over the account's token store, or `None` if the
    /// account never opted into tokens.
    pub async fn new(api: Arc<A>, address: &str, step: u64) -> Result<Option<Self>> {
        let resources = api.get_account_resources(address).await?;
        let Some(store) = token_store(&resources) else {
            debug!(address, "no token store, nothing to walk");
            return Ok(None);
        };
        Ok(Some(Self {
            deposits: EventProvider::new(api.clone(), &store.deposit_events, step),
            withdrawals: EventProvider::new(api.clone(), &store.withdraw_events, step),
            api,
            balances: BTreeMap::new(),
            confirmed: Vec::new(),
            done: false,
        }))
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Return up to `amount` owned tokens, walking further back as needed.
    pub async fn fetch(&mut self, amount: usize) -> Result<Vec<TokenData>> {
        while !self.done && self.confirmed.len() < amount {
            self.fetch_more().await;
        }
        let take = amount.min(self.confirmed.len());
        let ids: Vec<TokenDataId> = self.confirmed.drain(..take).collect();
        try_join_all(ids.iter().map(|id| self.api.get_token_data(id))).await
    }

    /// Advance both streams one page and fold the new events into the
    /// balance ledger.
    ///
    /// Withdrawals extract down to the shared floor; deposits stop one
    /// version above it so a deposit is never applied before the withdrawal
    /// that undoes it (at the same version boundary) has been seen.
    async fn fetch_more(&mut self) {
        let (withdraw_floor, _) =
            futures::join!(self.withdrawals.fetch_more(), self.deposits.fetch_more());

        for event in self.withdrawals.extract(withdraw_floor) {
            let Some(data) = event.token_data() else {
                continue;
            };
            let key = data.id.token_data_id.key();
            let balance = self.balances.entry(key).or_insert(0);
            if *balance <= 0 {
                *balance -= data.amount as i64;
            }
        }

        for event in self.deposits.extract(withdraw_floor.saturating_add(1)) {
            let Some(data) = event.token_data() else {
                continue;
            };
            let key = data.id.token_data_id.key();
            let balance = self.balances.entry(key).or_insert(0);
            if *balance <= 0 {
                *balance += data.amount as i64;
                if *balance > 0 {
                    self.confirmed.push(data.id.token_data_id);
                }
            }
        }

        self.done = self.deposits.is_done();
    }
}
