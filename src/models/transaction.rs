//! Transactions as returned by the fullnode REST API

use serde::{Deserialize, Serialize};

use super::event::Event;
use super::u64_string;

/// Entry functions recognized as plain coin transfers when classifying
/// coin events.
pub const COIN_TRANSFER_FUNCTIONS: &[&str] = &[
    "0x1::coin::transfer",
    "0x1::aptos_account::transfer",
    "0x1::aptos_account::transfer_coins",
];

/// A transaction fetched by version or hash. Only the variants the cache
/// layer ever resolves are modeled; coin events always belong to user
/// transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transaction {
    #[serde(rename = "user_transaction")]
    User(UserTransaction),
    #[serde(rename = "pending_transaction")]
    Pending(PendingTransaction),
}

impl Transaction {
    pub fn is_pending(&self) -> bool {
        matches!(self, Transaction::Pending(_))
    }

    pub fn hash(&self) -> &str {
        match self {
            Transaction::User(txn) => &txn.hash,
            Transaction::Pending(txn) => &txn.hash,
        }
    }
}

/// A committed user transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTransaction {
    #[serde(with = "u64_string")]
    pub version: u64,
    pub hash: String,
    pub sender: String,
    pub success: bool,
    /// Commit time in microseconds since the epoch.
    #[serde(with = "u64_string")]
    pub timestamp: u64,
    #[serde(with = "u64_string")]
    pub gas_used: u64,
    #[serde(with = "u64_string")]
    pub gas_unit_price: u64,
    pub payload: TransactionPayload,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl UserTransaction {
    /// Commit time in milliseconds since the epoch.
    pub fn timestamp_ms(&self) -> i64 {
        (self.timestamp / 1000) as i64
    }
}

/// A transaction submitted but not yet committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
    pub sender: String,
    #[serde(with = "u64_string")]
    pub expiration_timestamp_secs: u64,
    pub payload: TransactionPayload,
}

/// Transaction payload; anything other than an entry function call is
/// opaque to the activity layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionPayload {
    #[serde(rename = "entry_function_payload")]
    EntryFunction(EntryFunctionPayload),
    #[serde(other)]
    Unknown,
}

impl TransactionPayload {
    /// The called entry function if this is a recognized coin transfer.
    pub fn as_coin_transfer(&self) -> Option<&EntryFunctionPayload> {
        match self {
            TransactionPayload::EntryFunction(payload)
                if COIN_TRANSFER_FUNCTIONS.contains(&payload.function.as_str()) =>
            {
                Some(payload)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
}

impl EntryFunctionPayload {
    /// Recipient argument of a coin transfer call.
    pub fn transfer_recipient(&self) -> Option<String> {
        self.arguments
            .first()
            .and_then(|arg| arg.as_str())
            .map(str::to_string)
    }
}
