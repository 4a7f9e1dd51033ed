//! Capabilities consumed from the wallet, its loader and the transaction index store.
//!
//! Key management, on-disk storage and the index database live outside this crate. The sync
//! layer only ever talks to them through these traits.

use crate::backend::NetworkBackend;
use crate::wallet::types::{BlockIdentifier, BlockInfo, ChainTip, RescanProgress, WalletError};

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An opened wallet.
#[async_trait::async_trait]
pub trait Wallet: Send + Sync {
    fn locked(&self) -> bool;

    fn lock(&self);

    fn unlock(&self, passphrase: &[u8]) -> Result<(), WalletError>;

    fn change_private_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError>;

    fn change_public_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError>;

    /// Attach (`Some`) or detach (`None`) the wallet's network backend.
    fn set_network_backend(&self, backend: Option<Arc<dyn NetworkBackend>>);

    fn network_backend(&self) -> Option<Arc<dyn NetworkBackend>>;

    fn main_chain_tip(&self) -> ChainTip;

    fn block_info(&self, block: BlockIdentifier) -> Result<BlockInfo, WalletError>;

    /// Derive the next unused address of `account`.
    fn next_address(&self, account: u32) -> Result<String, WalletError>;

    fn have_address(&self, address: &str) -> bool;

    /// Rescan the chain from `from_height`, reporting progress on `progress`.
    ///
    /// Implementations stop when `token` is cancelled and close the channel by dropping
    /// `progress` when they return.
    async fn rescan_progress_from_height(
        &self,
        token: CancellationToken,
        backend: Arc<dyn NetworkBackend>,
        from_height: i32,
        progress: mpsc::Sender<RescanProgress>,
    );
}

/// Creates, opens and unloads the wallet kept in the data directory.
pub trait WalletLoader: Send + Sync {
    fn wallet_exists(&self) -> Result<bool, WalletError>;

    fn create_new_wallet(
        &self,
        public_passphrase: &[u8],
        private_passphrase: &[u8],
        seed: &[u8],
    ) -> Result<Arc<dyn Wallet>, WalletError>;

    fn open_existing_wallet(&self, public_passphrase: &[u8]) -> Result<Arc<dyn Wallet>, WalletError>;

    fn loaded_wallet(&self) -> Option<Arc<dyn Wallet>>;

    fn set_network_backend(&self, backend: Option<Arc<dyn NetworkBackend>>);

    fn unload_wallet(&self) -> Result<(), WalletError>;
}

/// Derives a fresh address for the index store.
pub type AddressGenerator = Box<dyn Fn() -> Result<String, WalletError> + Send + Sync>;

/// Reports whether an address belongs to the wallet.
pub type AddressOwnership = Box<dyn Fn(&str) -> Result<bool, WalletError> + Send + Sync>;

/// Handle to an initialized transaction index database.
pub trait TxIndex: Send + Sync {
    fn close(&self) -> Result<(), WalletError>;
}

pub trait AddressIndexStore: Send + Sync {
    fn initialize(
        &self,
        path: &Path,
        generate_address: AddressGenerator,
        address_matches_wallet: AddressOwnership,
    ) -> Result<Arc<dyn TxIndex>, WalletError>;
}
