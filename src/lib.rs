//! Aptos Activity Indexer Library
//!
//! Local cache-backed reconstruction of wallet activity: a per-network
//! RocksDB cache of chain reads, backward pagination over on-chain event
//! streams, and classification of raw events into a normalized, groupable
//! activity feed.

pub mod activity;
pub mod config;
pub mod database;
pub mod models;
pub mod providers;
pub mod rest;

// Re-export the main entry points
pub use activity::{group_by_time, transform_activities, ActivityEvent, ActivityKind};
pub use config::IndexerConfig;
pub use database::NetworkCacheDb;
pub use providers::{CoinActivityProvider, EventProvider, TokenProvider};
pub use rest::{CachedRestApi, NodeClient, RestApi};
