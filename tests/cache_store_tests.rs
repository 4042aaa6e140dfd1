//! Cache store integration tests

use anyhow::Result;
use aptos_activity_indexer::config::CacheConfig;
use aptos_activity_indexer::database::{CachedPendingTransaction, NetworkCacheDb};
use aptos_activity_indexer::models::{
    Event, EventGuid, PendingTransaction, Transaction, TransactionPayload, UserTransaction,
};
use tempfile::TempDir;

const NODE_URL: &str = "http://localhost:8080/v1";

/// Create a test cache instance with a temporary directory
fn create_test_cache() -> Result<(NetworkCacheDb, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = CacheConfig {
        path: temp_dir.path().to_path_buf(),
        ..Default::default()
    };
    let db = NetworkCacheDb::open(&config, NODE_URL, 1)?;
    Ok((db, temp_dir))
}

fn test_event(address: &str, creation_number: u64, sequence_number: u64, version: u64) -> Event {
    Event {
        version,
        sequence_number,
        guid: EventGuid {
            creation_number,
            account_address: address.to_string(),
        },
        event_type: "0x1::coin::DepositEvent".to_string(),
        data: serde_json::json!({ "amount": "100" }),
    }
}

fn test_transaction(version: u64) -> Transaction {
    Transaction::User(UserTransaction {
        version,
        hash: format!("0x{version:x}"),
        sender: "0xa11ce".to_string(),
        success: true,
        timestamp: 1_700_000_000_000_000,
        gas_used: 500,
        gas_unit_price: 100,
        payload: TransactionPayload::Unknown,
        events: vec![],
    })
}

#[tokio::test]
async fn networks_get_isolated_instances() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = CacheConfig {
        path: temp_dir.path().to_path_buf(),
        ..Default::default()
    };

    let mainnet = NetworkCacheDb::open(&config, NODE_URL, 1)?;
    mainnet.put_transaction(42, &test_transaction(42))?;
    drop(mainnet);

    // Same directory root, different chain: nothing leaks across.
    let testnet = NetworkCacheDb::open(&config, NODE_URL, 2)?;
    assert!(testnet.get_transaction(42)?.is_none());

    assert_ne!(
        NetworkCacheDb::instance_path(&config, NODE_URL, 1),
        NetworkCacheDb::instance_path(&config, NODE_URL, 2),
    );
    Ok(())
}

#[tokio::test]
async fn data_survives_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = CacheConfig {
        path: temp_dir.path().to_path_buf(),
        ..Default::default()
    };

    {
        let db = NetworkCacheDb::open(&config, NODE_URL, 1)?;
        db.put_transaction(7, &test_transaction(7))?;
    }

    let db = NetworkCacheDb::open(&config, NODE_URL, 1)?;
    let cached = db.get_transaction(7)?.expect("transaction should persist");
    assert_eq!(cached.hash(), "0x7");
    Ok(())
}

#[tokio::test]
async fn event_ranges_come_back_ordered_and_bounded() -> Result<()> {
    let (db, _tmp) = create_test_cache()?;
    let address = "0xa11ce";

    let events: Vec<Event> = (0..10)
        .map(|seq| test_event(address, 2, seq, 1000 + seq))
        .collect();
    db.put_events(address, 2, &events)?;
    // A different handle on the same account must not bleed in.
    db.put_events(address, 3, &[test_event(address, 3, 4, 2000)])?;

    let window = db.get_events(address, 2, 3, 7)?;
    let sequences: Vec<u64> = window.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![3, 4, 5, 6]);
    Ok(())
}

#[tokio::test]
async fn pending_transactions_index_by_sender_and_time() -> Result<()> {
    let (db, _tmp) = create_test_cache()?;

    for (hash, timestamp) in [("0xh1", 100), ("0xh2", 200), ("0xh3", 300)] {
        db.put_pending_transaction(&CachedPendingTransaction {
            txn: PendingTransaction {
                hash: hash.to_string(),
                sender: "0xa11ce".to_string(),
                expiration_timestamp_secs: 60,
                payload: TransactionPayload::Unknown,
            },
            timestamp,
        })?;
    }

    // Exclusive upper bound when both bounds are given and differ.
    let window = db.get_pending_transactions("0xa11ce", Some(100), Some(300))?;
    let hashes: Vec<&str> = window.iter().map(|p| p.txn.hash.as_str()).collect();
    assert_eq!(hashes, vec!["0xh1", "0xh2"]);

    // Unbounded query returns everything for the sender, in time order.
    let all = db.get_pending_transactions("0xa11ce", None, None)?;
    assert_eq!(all.len(), 3);

    // Other senders see nothing.
    let other = db.get_pending_transactions("0xb0b", None, None)?;
    assert!(other.is_empty());
    Ok(())
}
