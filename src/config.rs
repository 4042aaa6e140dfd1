//! Configuration for the wallet activity cache

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexerConfig {
    pub cache: CacheConfig,
    pub node: NodeConfig,
    pub sync: SyncConfig,
}

/// Local RocksDB cache tuning. One instance directory is created per
/// network under `path`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub enable_compression: bool,
    #[validate(range(min = 16, max = 10000))]
    pub max_open_files: i32,
    #[validate(range(min = 4, max = 2048))]
    pub write_buffer_size_mb: usize,
    #[validate(range(min = 2, max = 16))]
    pub max_write_buffer_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeConfig {
    #[validate(url)]
    pub node_url: String,
    #[validate(url)]
    pub name_api_url: String,
    #[validate(url)]
    pub token_api_url: String,
    #[validate(range(min = 1, max = 60))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}

/// Paging and freshness policy for cached chain reads.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    /// Events fetched per page when walking a stream backward.
    #[validate(range(min = 1, max = 100))]
    pub event_query_step: u64,
    #[validate(range(min = 1, max = 3600))]
    pub name_ttl_secs: u64,
    #[validate(range(min = 1, max = 3600))]
    pub token_data_ttl_secs: u64,
    #[validate(range(min = 1, max = 3600))]
    pub token_metadata_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "./data/restcache".into(),
            enable_compression: true,
            max_open_files: 256,
            write_buffer_size_mb: 16,
            max_write_buffer_number: 2,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_url: "https://fullnode.mainnet.aptoslabs.com/v1".to_string(),
            name_api_url: "https://www.aptosnames.com/api/mainnet".to_string(),
            token_api_url: "https://api.mainnet.aptoslabs.com/tokens".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            event_query_step: 20,
            name_ttl_secs: 5 * 60,
            token_data_ttl_secs: 60,
            token_metadata_ttl_secs: 60,
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Ensure the cache root directory exists.
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache.path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Validate::validate(&self.cache)?;
        Validate::validate(&self.node)?;
        Validate::validate(&self.sync)?;
        Ok(())
    }
}
