//! Wallet sync orchestrator and integration point for all sync services.
//!
//! This module defines the `WalletSyncOrchestrator`, the surface exposed to UI and mobile
//! callers. It wires the wallet lifecycle, the sync session, the rescan controller and the
//! progress broadcaster together around one wallet data directory.
//!
//! The orchestrator is responsible for:
//! - Registering progress listeners
//! - Starting SPV or RPC synchronization and cancelling it
//! - Starting and cancelling rescans over the attached backend
//! - Reporting the best block known to the wallet
//! - Releasing the backend and background work when the wallet is closed

use crate::backend::BackendFactory;
use crate::config::WalletSyncConfig;
use crate::wallet::interface::{AddressIndexStore, WalletLoader};
use crate::wallet::lifecycle::WalletLifecycle;
use crate::wallet::sync::{
    events::{ProgressBroadcaster, ProgressListener},
    rescan::{RescanController, RescanTask},
    session::{SyncSession, SyncState, SyncTask},
    strategies::{BackendConfig, BackendSelector},
};
use crate::wallet::types::{BlockIdentifier, Result};

use std::sync::Arc;
use tracing::{debug, error, info};

/// Main entry point coordinating wallet synchronization.
pub struct WalletSyncOrchestrator {
    config: WalletSyncConfig,
    lifecycle: WalletLifecycle,
    broadcaster: Arc<ProgressBroadcaster>,
    session: SyncSession,
    rescan: RescanController,
}

impl WalletSyncOrchestrator {
    /// Create an orchestrator for the wallet kept in `config.data_dir`.
    pub fn new(
        config: WalletSyncConfig,
        loader: Arc<dyn WalletLoader>,
        index_store: Arc<dyn AddressIndexStore>,
        factory: Arc<dyn BackendFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let broadcaster = Arc::new(ProgressBroadcaster::new());
        let lifecycle = WalletLifecycle::new(loader.clone(), index_store, config.tx_index_path());
        let selector = BackendSelector::new(config.network.clone(), factory, broadcaster.clone());
        let session = SyncSession::new(loader.clone(), selector, broadcaster.clone());
        let rescan = RescanController::new(loader, broadcaster.clone(), config.rescan_channel_capacity);

        info!(
            "Created wallet sync orchestrator for {} in {:?}",
            config.network.name, config.data_dir
        );

        Ok(Self {
            config,
            lifecycle,
            broadcaster,
            session,
            rescan,
        })
    }

    pub fn config(&self) -> &WalletSyncConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &WalletLifecycle {
        &self.lifecycle
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    pub fn sync_state(&self) -> SyncState {
        self.session.state()
    }

    pub fn is_rescanning(&self) -> bool {
        self.rescan.is_running()
    }

    /// Register a listener for sync and rescan progress. Listeners are never removed.
    pub fn add_sync_progress_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.broadcaster.register(listener);
        debug!("Registered progress listener, {} total", self.broadcaster.len());
    }

    /// Start SPV sync. `peer_addresses` is a semicolon-delimited list; empty means any peer.
    pub async fn start_peer_sync(&self, peer_addresses: &str) -> Result<SyncTask> {
        self.session.start(&BackendConfig::spv(peer_addresses)).await
    }

    /// Start sync through a full node's RPC server. An empty `certificate` disables TLS.
    pub async fn start_rpc_sync(
        &self,
        address: &str,
        username: &str,
        password: &str,
        certificate: &[u8],
    ) -> Result<SyncTask> {
        self.session
            .start(&BackendConfig::rpc(address, username, password, certificate))
            .await
    }

    /// Cancel the running sync, if any, and broadcast `on_synced(false)`.
    pub fn cancel_sync(&self) {
        self.session.cancel();
    }

    pub fn start_rescan(&self) -> Result<RescanTask> {
        self.rescan.start()
    }

    pub fn cancel_rescan(&self) {
        self.rescan.cancel();
    }

    /// Height of the wallet's main chain tip, or 0 without an open wallet.
    pub fn current_best_block_height(&self) -> i32 {
        self.lifecycle
            .wallet()
            .map(|wallet| wallet.main_chain_tip().height)
            .unwrap_or_default()
    }

    /// Timestamp of the wallet's main chain tip, or 0 when it cannot be determined.
    pub fn current_best_block_timestamp(&self) -> i64 {
        let Some(wallet) = self.lifecycle.wallet() else {
            return 0;
        };

        let tip = wallet.main_chain_tip();
        match wallet.block_info(BlockIdentifier::Height(tip.height)) {
            Ok(info) => {
                debug!(
                    "Best block {} at height {} mined {}",
                    info.hash,
                    info.height,
                    chrono::DateTime::<chrono::Utc>::from_timestamp(info.timestamp, 0)
                        .map(|time| time.to_rfc3339())
                        .unwrap_or_else(|| "at an invalid time".to_string())
                );
                info.timestamp
            }
            Err(e) => {
                error!("Failed to get best block info: {}", e);
                0
            }
        }
    }

    /// Stop background work and close the wallet.
    pub fn close_wallet(&self) -> Result<()> {
        self.session.cancel_quietly();
        self.rescan.cancel();
        self.lifecycle.close()
    }
}
