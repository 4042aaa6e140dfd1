//! Classification of consolidated indexer activity into feed events
//!
//! The indexer serves one row per transaction, carrying every coin, token
//! and staking sub-activity the transaction produced for the account. The
//! functions here are pure: they turn one such row into zero or more
//! [`ActivityEvent`]s, anchored on the transaction's gas fee event.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::warn;

use super::types::{ActivityEvent, ActivityKind, Identity};
use crate::models::{CoinInfo, COIN_DEPOSIT_EVENT_TYPE, COIN_WITHDRAW_EVENT_TYPE};

pub const GAS_FEE_EVENT_TYPE: &str = "0x1::aptos_coin::GasFeeEvent";

const TOKEN_DEPOSIT_EVENT_TYPE: &str = "0x3::token::DepositEvent";
const TOKEN_WITHDRAW_EVENT_TYPE: &str = "0x3::token::WithdrawEvent";
const TOKEN_MINT_EVENT_TYPE: &str = "0x3::token::MintTokenEvent";
const TOKEN_CLAIM_EVENT_TYPE: &str = "0x3::token_transfers::TokenClaimEvent";
const TOKEN_OFFER_EVENT_TYPE: &str = "0x3::token_transfers::TokenOfferEvent";

const STAKE_ADD_EVENT_TYPE: &str = "0x1::delegation_pool::AddStakeEvent";
const STAKE_UNLOCK_EVENT_TYPE: &str = "0x1::delegation_pool::UnlockStakeEvent";
const STAKE_WITHDRAW_EVENT_TYPE: &str = "0x1::delegation_pool::WithdrawStakeEvent";

/// The indexer encodes large integers as either JSON numbers or strings
/// depending on the column.
fn flexible_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// One consolidated activity row: everything a single transaction did that
/// concerns `account_address`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountActivity {
    pub account_address: String,
    #[serde(default)]
    pub coin_activities: Vec<CoinActivity>,
    #[serde(default)]
    pub token_activities: Vec<TokenActivity>,
    #[serde(default)]
    pub delegated_staking_activities: Vec<StakeActivity>,
    #[serde(deserialize_with = "flexible_u64")]
    pub transaction_version: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameEntry {
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinActivity {
    pub activity_type: String,
    #[serde(deserialize_with = "flexible_u64")]
    pub amount: u64,
    #[serde(default)]
    pub aptos_names: Vec<NameEntry>,
    #[serde(default)]
    pub coin_info: Option<CoinInfo>,
    pub coin_type: String,
    pub event_account_address: String,
    pub is_gas_fee: bool,
    pub is_transaction_success: bool,
    pub transaction_timestamp: NaiveDateTime,
    #[serde(deserialize_with = "flexible_u64")]
    pub transaction_version: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentTokenData {
    pub metadata_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenActivity {
    pub transfer_type: String,
    pub collection_name: String,
    pub creator_address: String,
    pub name: String,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub aptos_names_owner: Vec<NameEntry>,
    #[serde(default)]
    pub aptos_names_to: Vec<NameEntry>,
    #[serde(deserialize_with = "flexible_u64")]
    pub token_amount: u64,
    pub current_token_data: CurrentTokenData,
    pub event_account_address: String,
}

impl TokenActivity {
    /// Token identity as a comparable key.
    fn token_id(&self) -> (&str, &str, &str) {
        (&self.creator_address, &self.collection_name, &self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakeActivity {
    pub event_type: String,
    #[serde(deserialize_with = "flexible_u64")]
    pub amount: u64,
    pub pool_address: String,
    pub delegator_address: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// Every transaction charges gas, so a row without a gas fee event is
    /// malformed.
    #[error("no gas fee event in activity row")]
    GasNotFound,
    #[error("deposit/withdrawal mismatch: {0}")]
    DepositWithdrawalMismatch(&'static str),
}

fn identity_from_coin(activity: &CoinActivity) -> Identity {
    Identity::new(
        activity.event_account_address.clone(),
        activity.aptos_names.first().map(|n| n.domain.clone()),
    )
}

fn to_identity(activity: &TokenActivity) -> Option<Identity> {
    activity.to_address.as_ref().map(|address| {
        Identity::new(
            address.clone(),
            activity.aptos_names_to.first().map(|n| n.domain.clone()),
        )
    })
}

fn owner_identity(activity: &TokenActivity) -> Option<Identity> {
    activity.from_address.as_ref().map(|address| {
        Identity::new(
            address.clone(),
            activity.aptos_names_owner.first().map(|n| n.domain.clone()),
        )
    })
}

/// Split into deposits and withdrawals, each sorted by amount so the two
/// sides pair up positionally.
fn separate_coin_activities(activities: &[CoinActivity]) -> (Vec<&CoinActivity>, Vec<&CoinActivity>) {
    let mut deposits: Vec<&CoinActivity> = Vec::new();
    let mut withdrawals: Vec<&CoinActivity> = Vec::new();
    for activity in activities {
        match activity.activity_type.as_str() {
            COIN_DEPOSIT_EVENT_TYPE => deposits.push(activity),
            COIN_WITHDRAW_EVENT_TYPE => withdrawals.push(activity),
            _ => {}
        }
    }
    deposits.sort_by_key(|a| a.amount);
    withdrawals.sort_by_key(|a| a.amount);
    (deposits, withdrawals)
}

fn separate_token_activities(
    activities: &[TokenActivity],
) -> (Vec<&TokenActivity>, Vec<&TokenActivity>) {
    let mut deposits: Vec<&TokenActivity> = Vec::new();
    let mut withdrawals: Vec<&TokenActivity> = Vec::new();
    for activity in activities {
        match activity.transfer_type.as_str() {
            TOKEN_DEPOSIT_EVENT_TYPE => deposits.push(activity),
            TOKEN_WITHDRAW_EVENT_TYPE => withdrawals.push(activity),
            _ => {}
        }
    }
    (deposits, withdrawals)
}

/// More than one coin type moving, all within the account itself, reads as
/// a swap rather than a transfer.
fn is_coin_swap(activity: &AccountActivity) -> bool {
    let coin_types: std::collections::BTreeSet<&str> = activity
        .coin_activities
        .iter()
        .map(|a| a.coin_type.as_str())
        .collect();
    coin_types.len() > 1
        && activity
            .coin_activities
            .iter()
            .all(|a| a.event_account_address == activity.account_address)
}

fn process_coin_swap(activity: &AccountActivity) -> Result<Vec<ActivityKind>, TransformError> {
    let (deposits, withdrawals) = separate_coin_activities(&activity.coin_activities);
    if deposits.len() != withdrawals.len() {
        return Err(TransformError::DepositWithdrawalMismatch(
            "only one-for-one coin swaps are supported",
        ));
    }

    Ok(deposits
        .iter()
        .zip(withdrawals.iter())
        .map(|(deposit, withdrawal)| ActivityKind::SwapCoin {
            amount: withdrawal.amount as u128,
            coin: withdrawal.coin_type.clone(),
            coin_info: withdrawal.coin_info.clone(),
            swap_amount: deposit.amount as u128,
            swap_coin: deposit.coin_type.clone(),
            swap_coin_info: deposit.coin_info.clone(),
        })
        .collect())
}

fn process_coin_transfer(activity: &AccountActivity) -> Result<Vec<ActivityKind>, TransformError> {
    let (deposits, withdrawals) = separate_coin_activities(&activity.coin_activities);
    let mut result = Vec::new();

    for deposit in deposits {
        let withdrawal = withdrawals
            .iter()
            .find(|w| w.coin_type == deposit.coin_type)
            .copied()
            .ok_or(TransformError::DepositWithdrawalMismatch(
                "no matching withdrawal for deposit",
            ))?;

        if withdrawal.event_account_address == activity.account_address {
            result.push(ActivityKind::SendCoin {
                amount: deposit.amount as u128,
                coin: withdrawal.coin_type.clone(),
                coin_info: withdrawal.coin_info.clone(),
                receiver: identity_from_coin(deposit),
            });
        } else if deposit.event_account_address == activity.account_address {
            result.push(ActivityKind::ReceiveCoin {
                amount: deposit.amount as u128,
                coin: deposit.coin_type.clone(),
                coin_info: deposit.coin_info.clone(),
                sender: identity_from_coin(withdrawal),
            });
        }
        // Movements between two other parties are not this account's
        // activity.
    }

    Ok(result)
}

fn transform_coin_activities(
    activity: &AccountActivity,
) -> Result<Vec<ActivityKind>, TransformError> {
    if is_coin_swap(activity) {
        process_coin_swap(activity)
    } else {
        process_coin_transfer(activity)
    }
}

fn process_mint_token(activity: &AccountActivity) -> Vec<ActivityKind> {
    activity
        .token_activities
        .iter()
        .filter(|t| t.transfer_type == TOKEN_MINT_EVENT_TYPE)
        .map(|t| ActivityKind::MintToken {
            collection: t.collection_name.clone(),
            name: t.name.clone(),
            uri: t.current_token_data.metadata_uri.clone(),
            amount: t.token_amount as u128,
            minter: owner_identity(t),
        })
        .collect()
}

fn process_indirect_token_transfer(activity: &AccountActivity) -> Vec<ActivityKind> {
    let account = &activity.account_address;
    let mut result = Vec::new();

    for token in &activity.token_activities {
        match token.transfer_type.as_str() {
            TOKEN_CLAIM_EVENT_TYPE => {
                if token.to_address.as_deref() == Some(account) {
                    result.push(ActivityKind::ReceiveToken {
                        collection: token.collection_name.clone(),
                        name: token.name.clone(),
                        uri: token.current_token_data.metadata_uri.clone(),
                        sender: owner_identity(token),
                    });
                } else if token.from_address.as_deref() == Some(account) {
                    result.push(ActivityKind::SendToken {
                        collection: token.collection_name.clone(),
                        name: token.name.clone(),
                        uri: token.current_token_data.metadata_uri.clone(),
                        receiver: to_identity(token),
                    });
                }
            }
            TOKEN_OFFER_EVENT_TYPE => {
                if token.to_address.as_deref() == Some(account) {
                    result.push(ActivityKind::ReceiveTokenOffer {
                        collection: token.collection_name.clone(),
                        name: token.name.clone(),
                        uri: token.current_token_data.metadata_uri.clone(),
                        sender: owner_identity(token),
                    });
                } else if token.from_address.as_deref() == Some(account) {
                    result.push(ActivityKind::SendTokenOffer {
                        collection: token.collection_name.clone(),
                        name: token.name.clone(),
                        uri: token.current_token_data.metadata_uri.clone(),
                        receiver: to_identity(token),
                    });
                }
            }
            _ => {}
        }
    }

    result
}

fn process_token_transfer(activity: &AccountActivity) -> Result<Vec<ActivityKind>, TransformError> {
    let account = &activity.account_address;
    let (deposits, withdrawals) = separate_token_activities(&activity.token_activities);
    let mut result = Vec::new();

    // Unbalanced sides happen when the counterparty is a marketplace
    // contract rather than a plain account; deposits to us still count.
    if deposits.len() != withdrawals.len() {
        for deposit in &deposits {
            if deposit.event_account_address == *account {
                result.push(ActivityKind::ReceiveToken {
                    collection: deposit.collection_name.clone(),
                    name: deposit.name.clone(),
                    uri: deposit.current_token_data.metadata_uri.clone(),
                    sender: None,
                });
            }
        }
        if !result.is_empty() {
            return Ok(result);
        }
        return Err(TransformError::DepositWithdrawalMismatch(
            "deposits must have corresponding withdrawals",
        ));
    }

    for (deposit, withdrawal) in deposits.iter().copied().zip(withdrawals.iter().copied()) {
        if deposit.token_id() != withdrawal.token_id() {
            return Err(TransformError::DepositWithdrawalMismatch(
                "token identities do not match",
            ));
        }

        if deposit.event_account_address == *account {
            result.push(ActivityKind::ReceiveToken {
                collection: deposit.collection_name.clone(),
                name: deposit.name.clone(),
                uri: deposit.current_token_data.metadata_uri.clone(),
                sender: owner_identity(withdrawal),
            });
        } else if withdrawal.event_account_address == *account {
            result.push(ActivityKind::SendToken {
                collection: withdrawal.collection_name.clone(),
                name: withdrawal.name.clone(),
                uri: withdrawal.current_token_data.metadata_uri.clone(),
                receiver: to_identity(deposit),
            });
        }
    }

    Ok(result)
}

fn transform_token_activities(
    activity: &AccountActivity,
) -> Result<Vec<ActivityKind>, TransformError> {
    let has_indirect = activity.token_activities.iter().any(|t| {
        t.transfer_type == TOKEN_CLAIM_EVENT_TYPE || t.transfer_type == TOKEN_OFFER_EVENT_TYPE
    });
    if has_indirect {
        return Ok(process_indirect_token_transfer(activity));
    }
    let has_mint = activity
        .token_activities
        .iter()
        .any(|t| t.transfer_type == TOKEN_MINT_EVENT_TYPE);
    if has_mint {
        return Ok(process_mint_token(activity));
    }
    process_token_transfer(activity)
}

fn transform_stake_activities(activity: &AccountActivity) -> Vec<ActivityKind> {
    let mut result = Vec::new();
    // Withdrawals arrive chopped into chunks; users want one row per pool.
    let mut total_withdrawn: BTreeMap<&str, u128> = BTreeMap::new();

    for stake in &activity.delegated_staking_activities {
        match stake.event_type.as_str() {
            STAKE_ADD_EVENT_TYPE => result.push(ActivityKind::AddStake {
                amount: stake.amount as u128,
                pool: stake.pool_address.clone(),
            }),
            STAKE_UNLOCK_EVENT_TYPE => result.push(ActivityKind::Unstake {
                amount: stake.amount as u128,
                pool: stake.pool_address.clone(),
            }),
            STAKE_WITHDRAW_EVENT_TYPE => {
                *total_withdrawn.entry(&stake.pool_address).or_insert(0) += stake.amount as u128;
            }
            other => {
                warn!(event_type = other, "unrecognized staking activity, dropping");
            }
        }
    }

    for (pool, amount) in total_withdrawn {
        result.push(ActivityKind::WithdrawStake {
            amount,
            pool: pool.to_string(),
        });
    }

    result
}

/// Turn one consolidated row into feed events.
///
/// The gas fee event anchors version, timestamp, success and gas for every
/// derived event. A row that produced no recognizable activity but whose
/// gas was paid by this account becomes a bare [`ActivityKind::Gas`] row.
pub fn transform_account_activity(
    activity: &AccountActivity,
) -> Result<Vec<ActivityEvent>, TransformError> {
    let gas = activity
        .coin_activities
        .iter()
        .find(|a| a.activity_type == GAS_FEE_EVENT_TYPE)
        .ok_or(TransformError::GasNotFound)?;

    let coin_kinds = transform_coin_activities(activity)?;
    let token_kinds = transform_token_activities(activity)?;
    let stake_kinds = transform_stake_activities(activity);

    let mut kinds = Vec::new();
    if stake_kinds.is_empty() {
        // Staking fires coin events of its own; suppress the duplicates.
        kinds.extend(coin_kinds);
    }
    kinds.extend(stake_kinds);
    kinds.extend(token_kinds);

    if kinds.is_empty() && gas.event_account_address == activity.account_address {
        kinds.push(ActivityKind::Gas);
    }

    let timestamp = gas.transaction_timestamp.and_utc();
    Ok(kinds
        .into_iter()
        .enumerate()
        .map(|(event_index, kind)| ActivityEvent {
            account: activity.account_address.clone(),
            version: gas.transaction_version,
            event_index,
            gas: gas.amount,
            success: gas.is_transaction_success,
            timestamp,
            kind,
        })
        .collect())
}

/// Transform a batch of rows, logging and skipping the ones that fail to
/// classify instead of losing the whole page.
pub fn transform_activities(activities: &[AccountActivity]) -> Vec<ActivityEvent> {
    let mut events = Vec::new();
    for activity in activities {
        match transform_account_activity(activity) {
            Ok(mut derived) => events.append(&mut derived),
            Err(err) => {
                warn!(
                    version = activity.transaction_version,
                    %err,
                    "skipping unclassifiable activity row"
                );
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    const ACCOUNT: &str = "0xa7c0";
    const OTHER: &str = "0xbf3c";
    const APT: &str = "0x1::aptos_coin::AptosCoin";
    const WETH: &str = "0xf22b::asset::WETH";

    fn ts() -> NaiveDateTime {
        Utc.with_ymd_and_hms(2022, 10, 20, 4, 1, 35)
            .unwrap()
            .naive_utc()
    }

    fn coin_activity(
        activity_type: &str,
        amount: u64,
        coin_type: &str,
        event_account: &str,
    ) -> CoinActivity {
        CoinActivity {
            activity_type: activity_type.to_string(),
            amount,
            aptos_names: vec![],
            coin_info: None,
            coin_type: coin_type.to_string(),
            event_account_address: event_account.to_string(),
            is_gas_fee: activity_type == GAS_FEE_EVENT_TYPE,
            is_transaction_success: true,
            transaction_timestamp: ts(),
            transaction_version: 4980001,
        }
    }

    fn row(coin_activities: Vec<CoinActivity>) -> AccountActivity {
        AccountActivity {
            account_address: ACCOUNT.to_string(),
            coin_activities,
            token_activities: vec![],
            delegated_staking_activities: vec![],
            transaction_version: 4980001,
        }
    }

    fn stake(event_type: &str, amount: u64, pool: &str) -> StakeActivity {
        StakeActivity {
            event_type: event_type.to_string(),
            amount,
            pool_address: pool.to_string(),
            delegator_address: ACCOUNT.to_string(),
        }
    }

    #[test]
    fn classifies_a_plain_send() {
        let activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 54100, APT, ACCOUNT),
            coin_activity(COIN_WITHDRAW_EVENT_TYPE, 2_440_000, APT, ACCOUNT),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 2_440_000, APT, OTHER),
        ]);

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.version, 4980001);
        assert_eq!(event.gas, 54100);
        assert!(event.success);
        assert_eq!(event.timestamp, ts().and_utc());
        let ActivityKind::SendCoin { amount, coin, receiver, .. } = &event.kind else {
            panic!("expected a send, got {:?}", event.kind);
        };
        assert_eq!(*amount, 2_440_000);
        assert_eq!(coin, APT);
        assert_eq!(receiver.address, OTHER);
    }

    #[test]
    fn classifies_a_receive() {
        let activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 58500, APT, OTHER),
            coin_activity(COIN_WITHDRAW_EVENT_TYPE, 823, APT, OTHER),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 823, APT, ACCOUNT),
        ]);

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        let ActivityKind::ReceiveCoin { amount, sender, .. } = &events[0].kind else {
            panic!("expected a receive");
        };
        assert_eq!(*amount, 823);
        assert_eq!(sender.address, OTHER);
    }

    #[test]
    fn self_transfer_reads_as_send() {
        let activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 750, APT, ACCOUNT),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 717, APT, ACCOUNT),
            coin_activity(COIN_WITHDRAW_EVENT_TYPE, 717, APT, ACCOUNT),
        ]);

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        let ActivityKind::SendCoin { receiver, .. } = &events[0].kind else {
            panic!("expected a send");
        };
        assert_eq!(receiver.address, ACCOUNT);
    }

    #[test]
    fn two_coin_types_within_the_account_classify_as_swap() {
        let activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 480700, APT, ACCOUNT),
            coin_activity(COIN_WITHDRAW_EVENT_TYPE, 21_362_666, WETH, ACCOUNT),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 173_317_163, APT, ACCOUNT),
        ]);

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        let ActivityKind::SwapCoin {
            amount,
            coin,
            swap_amount,
            swap_coin,
            ..
        } = &events[0].kind
        else {
            panic!("expected a swap");
        };
        assert_eq!(*amount, 21_362_666);
        assert_eq!(coin, WETH);
        assert_eq!(*swap_amount, 173_317_163);
        assert_eq!(swap_coin, APT);
    }

    #[test]
    fn gas_only_transactions_become_gas_rows() {
        let activity = row(vec![coin_activity(GAS_FEE_EVENT_TYPE, 99600, APT, ACCOUNT)]);
        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActivityKind::Gas);
    }

    #[test]
    fn gas_paid_by_someone_else_yields_nothing() {
        let activity = row(vec![coin_activity(GAS_FEE_EVENT_TYPE, 99600, APT, OTHER)]);
        let events = transform_account_activity(&activity).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn missing_gas_event_is_an_error() {
        let activity = row(vec![coin_activity(
            COIN_DEPOSIT_EVENT_TYPE,
            1,
            APT,
            ACCOUNT,
        )]);
        assert_eq!(
            transform_account_activity(&activity),
            Err(TransformError::GasNotFound)
        );
    }

    #[test]
    fn unmatched_deposit_is_an_error() {
        let activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 100, APT, ACCOUNT),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 5, APT, ACCOUNT),
        ]);
        assert!(matches!(
            transform_account_activity(&activity),
            Err(TransformError::DepositWithdrawalMismatch(_))
        ));
    }

    #[test]
    fn stake_withdraw_chunks_merge_per_pool() {
        let mut activity = row(vec![coin_activity(GAS_FEE_EVENT_TYPE, 54100, APT, ACCOUNT)]);
        activity.delegated_staking_activities = vec![
            stake(STAKE_WITHDRAW_EVENT_TYPE, 5_000_000_000, "0xcd3c"),
            stake(STAKE_WITHDRAW_EVENT_TYPE, 3000, "0xcd3c"),
        ];

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            ActivityKind::WithdrawStake {
                amount: 5_000_003_000,
                pool: "0xcd3c".to_string(),
            }
        );
    }

    #[test]
    fn staking_suppresses_its_own_coin_events() {
        let mut activity = row(vec![
            coin_activity(GAS_FEE_EVENT_TYPE, 54100, APT, ACCOUNT),
            coin_activity(COIN_WITHDRAW_EVENT_TYPE, 5_000_000_000, APT, ACCOUNT),
            coin_activity(COIN_DEPOSIT_EVENT_TYPE, 5_000_000_000, APT, OTHER),
        ]);
        activity.delegated_staking_activities =
            vec![stake(STAKE_ADD_EVENT_TYPE, 5_000_000_000, "0xcd3c")];

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            ActivityKind::AddStake {
                amount: 5_000_000_000,
                pool: "0xcd3c".to_string(),
            }
        );
    }

    #[test]
    fn direct_token_transfer_pairs_deposit_with_withdrawal() {
        let token = |transfer_type: &str, event_account: &str| TokenActivity {
            transfer_type: transfer_type.to_string(),
            collection_name: "Cool Cats".to_string(),
            creator_address: "0xc".to_string(),
            name: "Cat #1".to_string(),
            from_address: Some(OTHER.to_string()),
            to_address: Some(ACCOUNT.to_string()),
            aptos_names_owner: vec![],
            aptos_names_to: vec![],
            token_amount: 1,
            current_token_data: CurrentTokenData {
                metadata_uri: "ipfs://cat1".to_string(),
            },
            event_account_address: event_account.to_string(),
        };
        let mut activity = row(vec![coin_activity(GAS_FEE_EVENT_TYPE, 100, APT, OTHER)]);
        activity.token_activities = vec![
            token(TOKEN_DEPOSIT_EVENT_TYPE, ACCOUNT),
            token(TOKEN_WITHDRAW_EVENT_TYPE, OTHER),
        ];

        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events.len(), 1);
        let ActivityKind::ReceiveToken { name, sender, .. } = &events[0].kind else {
            panic!("expected a token receive");
        };
        assert_eq!(name, "Cat #1");
        assert_eq!(sender.as_ref().unwrap().address, OTHER);
    }

    #[test]
    fn batch_transform_drops_bad_rows_and_keeps_the_rest() {
        let good = row(vec![coin_activity(GAS_FEE_EVENT_TYPE, 10, APT, ACCOUNT)]);
        let bad = row(vec![]);
        let events = transform_activities(&[bad, good]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActivityKind::Gas);
    }

    #[test]
    fn deserializes_indexer_shaped_json() {
        let raw = serde_json::json!({
            "account_address": ACCOUNT,
            "transaction_version": "4980001",
            "coin_activities": [{
                "activity_type": GAS_FEE_EVENT_TYPE,
                "amount": "54100",
                "aptos_names": [{ "domain": "alice.apt" }],
                "coin_type": APT,
                "event_account_address": ACCOUNT,
                "is_gas_fee": true,
                "is_transaction_success": true,
                "transaction_timestamp": "2022-10-20T04:01:35",
                "transaction_version": 4980001,
            }],
        });
        let activity: AccountActivity = serde_json::from_value(raw).unwrap();
        assert_eq!(activity.coin_activities[0].amount, 54100);
        let events = transform_account_activity(&activity).unwrap();
        assert_eq!(events[0].kind, ActivityKind::Gas);
    }
}
