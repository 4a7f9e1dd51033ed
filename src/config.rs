//! Configuration for the wallet sync layer.
//!
//! `WalletSyncConfig` carries the wallet data directory, the active network parameters and the
//! tunables of the rescan pipeline. It can be built in code or loaded from a JSON file; missing
//! fields fall back to their defaults.

use crate::wallet::types::WalletSyncError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the transaction index database inside the wallet data directory.
pub const TX_INDEX_DB_NAME: &str = "txindex.db";

/// Ports and naming for a network the wallet can sync against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub name: String,
    /// Default peer-to-peer port, appended to SPV peers given without one.
    pub default_port: u16,
    /// Default JSON-RPC port of the full node, appended to RPC addresses given without one.
    pub rpc_client_port: u16,
}

impl NetworkParams {
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet".to_string(),
            default_port: 9108,
            rpc_client_port: 9109,
        }
    }

    pub fn testnet3() -> Self {
        Self {
            name: "testnet3".to_string(),
            default_port: 19108,
            rpc_client_port: 19109,
        }
    }

    pub fn simnet() -> Self {
        Self {
            name: "simnet".to_string(),
            default_port: 18555,
            rpc_client_port: 19556,
        }
    }

    /// Look up a known network by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mainnet" => Some(Self::mainnet()),
            "testnet3" | "testnet" => Some(Self::testnet3()),
            "simnet" => Some(Self::simnet()),
            _ => None,
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSyncConfig {
    /// Directory holding the wallet and its transaction index database.
    pub data_dir: PathBuf,
    pub network: NetworkParams,
    /// Capacity of the bounded channel carrying rescan progress.
    pub rescan_channel_capacity: usize,
}

impl Default for WalletSyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            network: NetworkParams::default(),
            rescan_channel_capacity: 1,
        }
    }
}

impl WalletSyncConfig {
    pub fn new(data_dir: impl Into<PathBuf>, network: NetworkParams) -> Self {
        Self {
            data_dir: data_dir.into(),
            network,
            ..Self::default()
        }
    }

    /// Load and validate a JSON configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WalletSyncError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        info!(
            "Loaded sync configuration for {} from {:?}",
            config.network.name, path
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WalletSyncError> {
        if self.rescan_channel_capacity == 0 {
            return Err(WalletSyncError::Config(
                "rescan_channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.network.default_port == 0 || self.network.rpc_client_port == 0 {
            return Err(WalletSyncError::Config(format!(
                "network {} has no default ports",
                self.network.name
            )));
        }
        Ok(())
    }

    /// Location of the transaction index database.
    pub fn tx_index_path(&self) -> PathBuf {
        self.data_dir.join(TX_INDEX_DB_NAME)
    }
}
