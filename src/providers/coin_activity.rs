//! Reconstruction of an account's confirmed coin activity
//!
//! Merges the deposit and withdraw event streams of every coin store the
//! account holds, walking all of them backward in lockstep and resolving
//! each coin event against its transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use super::event::EventProvider;
use crate::models::{
    coin_stores_by_type, CoinInfo, Event, Transaction, COIN_WITHDRAW_EVENT_TYPE,
};
use crate::rest::error::pruned_floor;
use crate::rest::RestApi;

/// Facts shared by every resolved coin event.
#[derive(Debug, Clone)]
pub struct CoinActivityDetails {
    /// The account whose activity is being reconstructed.
    pub account: String,
    pub coin_type: String,
    pub coin_info: Option<CoinInfo>,
    /// Signed amount in base units; negative for withdrawals.
    pub amount: i128,
    pub creation_number: u64,
    pub sequence_number: u64,
    pub success: bool,
    pub timestamp_ms: i64,
    pub version: u64,
}

/// A coin event resolved against its transaction.
#[derive(Debug, Clone)]
pub enum ConfirmedActivityItem {
    /// The transaction was a recognized plain transfer between accounts.
    CoinTransfer {
        details: CoinActivityDetails,
        sender: String,
        sender_name: Option<String>,
        recipient: Option<String>,
        recipient_name: Option<String>,
    },
    /// Anything else that moved coins (swaps, staking, contract calls).
    CoinEvent { details: CoinActivityDetails },
}

impl ConfirmedActivityItem {
    pub fn details(&self) -> &CoinActivityDetails {
        match self {
            ConfirmedActivityItem::CoinTransfer { details, .. } => details,
            ConfirmedActivityItem::CoinEvent { details } => details,
        }
    }
}

pub struct CoinActivityProvider<A> {
    api: Arc<A>,
    account: String,
    /// Deposit and withdraw streams per coin type.
    streams: BTreeMap<String, Vec<EventProvider<A>>>,
    /// Transaction versions below this were pruned by the node and can no
    /// longer be resolved.
    min_available_txn_version: u64,
    done: bool,
}

impl<A: RestApi> CoinActivityProvider<A> {
    /// Discover the account's coin stores and set up a backward walk over
    /// every deposit and withdraw stream.
    pub async fn new(api: Arc<A>, address: &str, step: u64) -> Result<Self> {
        let resources = api.get_account_resources(address).await?;
        let stores = coin_stores_by_type(&resources);
        let mut streams = BTreeMap::new();
        for (coin_type, store) in stores {
            streams.insert(
                coin_type,
                vec![
                    EventProvider::new(api.clone(), &store.deposit_events, step),
                    EventProvider::new(api.clone(), &store.withdraw_events, step),
                ],
            );
        }
        debug!(address, streams = streams.len() * 2, "coin activity walk set up");
        Ok(Self {
            api,
            account: address.to_string(),
            streams,
            min_available_txn_version: 0,
            done: false,
        })
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn min_available_txn_version(&self) -> u64 {
        self.min_available_txn_version
    }

    /// Advance every stream one page and emit the events that are safe to
    /// consume.
    ///
    /// Extraction is floored at the maximum of the per-stream watermarks so
    /// no stream can contribute an event another stream has not reached
    /// yet; anything below the floor stays buffered for a later round.
    pub async fn fetch_more(&mut self) -> Result<Vec<ConfirmedActivityItem>> {
        let watermarks =
            join_all(self.streams.values_mut().flatten().map(|s| s.fetch_more())).await;
        let floor = watermarks.into_iter().max().unwrap_or(0);

        let mut resolutions = Vec::new();
        for (coin_type, streams) in self.streams.iter_mut() {
            for stream in streams.iter_mut() {
                let creation_number = stream.creation_number();
                for event in stream.extract(floor) {
                    if event.version < self.min_available_txn_version || !event.is_coin_event() {
                        continue;
                    }
                    resolutions.push(resolve_coin_event(
                        self.api.clone(),
                        self.account.clone(),
                        coin_type.clone(),
                        creation_number,
                        event,
                    ));
                }
            }
        }

        let mut items = Vec::new();
        for outcome in join_all(resolutions).await {
            match outcome {
                Ok(item) => items.push(item),
                Err(floor) => {
                    self.min_available_txn_version = self.min_available_txn_version.max(floor);
                }
            }
        }

        self.done = self.streams.values().flatten().all(|s| s.is_done());
        Ok(items)
    }
}

/// Resolve one coin event against its transaction. On failure returns the
/// version floor to raise: the node's pruning floor when reported, else
/// just past nothing (the event's own version) so only this event is lost.
async fn resolve_coin_event<A: RestApi>(
    api: Arc<A>,
    account: String,
    coin_type: String,
    creation_number: u64,
    event: Event,
) -> Result<ConfirmedActivityItem, u64> {
    let version = event.version;
    build_item(api, account, coin_type, creation_number, event)
        .await
        .map_err(|err| {
            let floor = pruned_floor(&err).unwrap_or(version);
            warn!(version, %err, "dropping unresolvable coin event");
            floor
        })
}

async fn build_item<A: RestApi>(
    api: Arc<A>,
    account: String,
    coin_type: String,
    creation_number: u64,
    event: Event,
) -> Result<ConfirmedActivityItem> {
    let data = event
        .coin_data()
        .ok_or_else(|| anyhow!("malformed coin event payload at version {}", event.version))?;
    let is_withdraw = event.event_type == COIN_WITHDRAW_EVENT_TYPE;
    let amount = if is_withdraw {
        -(data.amount as i128)
    } else {
        data.amount as i128
    };

    let txn = api.get_transaction(event.version).await?;
    let Transaction::User(user) = txn else {
        return Err(anyhow!(
            "version {} did not resolve to a committed user transaction",
            event.version
        ));
    };

    // Coin info and names are presentation data; their lookups failing
    // must not lose the event.
    let coin_info = api.get_coin_info(&coin_type).await.ok();

    let details = CoinActivityDetails {
        account,
        coin_type,
        coin_info,
        amount,
        creation_number,
        sequence_number: event.sequence_number,
        success: user.success,
        timestamp_ms: user.timestamp_ms(),
        version: event.version,
    };

    if let Some(transfer) = user.payload.as_coin_transfer() {
        let recipient = transfer.transfer_recipient();
        let sender_name = api.get_name_from_address(&user.sender).await.ok().flatten();
        let recipient_name = match &recipient {
            Some(addr) => api.get_name_from_address(addr).await.ok().flatten(),
            None => None,
        };
        return Ok(ConfirmedActivityItem::CoinTransfer {
            details,
            sender: user.sender,
            sender_name,
            recipient,
            recipient_name,
        });
    }

    Ok(ConfirmedActivityItem::CoinEvent { details })
}
