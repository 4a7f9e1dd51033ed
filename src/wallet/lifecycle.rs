//! Wallet lifecycle: create, open, unlock, lock, change passphrases and close.
//!
//! Passphrase buffers handed to this module are caller-owned and are zeroed before every
//! method returns, on success and failure alike.

use crate::backend::NetworkBackend;
use crate::utils::passphrase::{INSECURE_PUBLIC_PASSPHRASE, Passphrase};
use crate::utils::seed::decode_seed;
use crate::wallet::interface::{
    AddressGenerator, AddressIndexStore, AddressOwnership, TxIndex, Wallet, WalletLoader,
};
use crate::wallet::types::{Result, WalletSyncError};

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info};
use zeroize::Zeroizing;

/// Account used to derive addresses for the transaction index.
const DEFAULT_ACCOUNT: u32 = 0;

pub struct WalletLifecycle {
    loader: Arc<dyn WalletLoader>,
    index_store: Arc<dyn AddressIndexStore>,
    tx_index_path: PathBuf,
    tx_index: RwLock<Option<Arc<dyn TxIndex>>>,
}

impl WalletLifecycle {
    pub fn new(
        loader: Arc<dyn WalletLoader>,
        index_store: Arc<dyn AddressIndexStore>,
        tx_index_path: PathBuf,
    ) -> Self {
        Self {
            loader,
            index_store,
            tx_index_path,
            tx_index: RwLock::new(None),
        }
    }

    pub fn loader(&self) -> &Arc<dyn WalletLoader> {
        &self.loader
    }

    pub fn tx_index_path(&self) -> &Path {
        &self.tx_index_path
    }

    /// The wallet currently loaded by the loader.
    pub fn wallet(&self) -> Option<Arc<dyn Wallet>> {
        self.loader.loaded_wallet()
    }

    pub fn tx_index(&self) -> Option<Arc<dyn TxIndex>> {
        self.tx_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.loader.wallet_exists()?)
    }

    pub fn is_opened(&self) -> bool {
        self.wallet().is_some()
    }

    /// Create a wallet from a seed mnemonic (or hex seed), protected by `passphrase`.
    pub fn create(&self, passphrase: &str, seed_mnemonic: &str) -> Result<Arc<dyn Wallet>> {
        info!("Creating wallet");
        if seed_mnemonic.is_empty() {
            return Err(WalletSyncError::EmptySeed);
        }

        let private_passphrase = Zeroizing::new(passphrase.as_bytes().to_vec());
        let seed = decode_seed(seed_mnemonic).inspect_err(|e| error!("{}", e))?;

        let wallet = self
            .loader
            .create_new_wallet(INSECURE_PUBLIC_PASSPHRASE, &private_passphrase, &seed)
            .inspect_err(|e| error!("Failed to create wallet: {}", e))?;

        info!("Created wallet");
        Ok(wallet)
    }

    /// Open the existing wallet and initialize its transaction index.
    ///
    /// The index is ready before this returns, so sync and notifications can rely on it.
    pub fn open(&self, public_passphrase: &[u8]) -> Result<Arc<dyn Wallet>> {
        let wallet = self
            .loader
            .open_existing_wallet(public_passphrase)
            .inspect_err(|e| error!("Failed to open wallet: {}", e))?;

        let generator_wallet = wallet.clone();
        let generate_address: AddressGenerator =
            Box::new(move || generator_wallet.next_address(DEFAULT_ACCOUNT));
        let ownership_wallet = wallet.clone();
        let address_matches_wallet: AddressOwnership =
            Box::new(move |address: &str| Ok(ownership_wallet.have_address(address)));

        let tx_index = self
            .index_store
            .initialize(&self.tx_index_path, generate_address, address_matches_wallet)
            .map_err(|e| {
                error!("Error initializing tx index database: {}", e);
                WalletSyncError::TxIndex(e.to_string())
            })?;
        *self.tx_index.write().unwrap_or_else(PoisonError::into_inner) = Some(tx_index);

        info!("Opened wallet, tx index at {:?}", self.tx_index_path);
        Ok(wallet)
    }

    pub fn unlock(&self, private_passphrase: &mut [u8]) -> Result<()> {
        let passphrase = Passphrase::new(private_passphrase);
        let wallet = self.wallet().ok_or(WalletSyncError::WalletNotLoaded)?;

        Ok(wallet.unlock(&passphrase)?)
    }

    /// Lock the wallet if it is unlocked.
    pub fn lock(&self) {
        if let Some(wallet) = self.wallet().filter(|wallet| !wallet.locked()) {
            wallet.lock();
            info!("Wallet locked");
        }
    }

    pub fn change_private_passphrase(&self, old: &mut [u8], new: &mut [u8]) -> Result<()> {
        let old = Passphrase::new(old);
        let new = Passphrase::new(new);
        let wallet = self.wallet().ok_or(WalletSyncError::WalletNotLoaded)?;

        Ok(wallet.change_private_passphrase(&old, &new)?)
    }

    /// Change the public passphrase. Empty passphrases stand for the insecure default.
    pub fn change_public_passphrase(&self, old: &mut [u8], new: &mut [u8]) -> Result<()> {
        let old = Passphrase::new(old);
        let new = Passphrase::new(new);
        let wallet = self.wallet().ok_or(WalletSyncError::WalletNotLoaded)?;

        Ok(wallet.change_public_passphrase(old.or_insecure_default(), new.or_insecure_default())?)
    }

    /// Close the tx index and unload the wallet, releasing any attached backend.
    pub fn close(&self) -> Result<()> {
        let none: Option<Arc<dyn NetworkBackend>> = None;
        if let Some(wallet) = self.wallet() {
            wallet.set_network_backend(none.clone());
        }
        self.loader.set_network_backend(none);

        if let Some(tx_index) = self
            .tx_index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            if let Err(e) = tx_index.close() {
                error!("Failed to close tx index database: {}", e);
            }
        }

        self.loader.unload_wallet()?;
        info!("Closed wallet");
        Ok(())
    }
}
