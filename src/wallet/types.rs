use crate::backend::RunError;

use serde::{Deserialize, Serialize};

/// Failures reported by the wallet, its loader and the index store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
	#[error("invalid passphrase")]
	InvalidPassphrase,

	#[error("wallet does not exist")]
	NotExist,

	#[error("wallet already exists")]
	AlreadyExists,

	#[error("wallet is locked")]
	Locked,

	#[error("operation canceled")]
	Canceled,

	#[error("{0}")]
	Other(String),
}

/// Error taxonomy of the wallet sync layer
#[derive(Debug, thiserror::Error)]
pub enum WalletSyncError {
	#[error("seed mnemonic is empty")]
	EmptySeed,

	#[error("invalid seed: {0}")]
	InvalidSeed(String),

	#[error("no valid peer addresses")]
	InvalidPeers,

	#[error("invalid network address: {0}")]
	InvalidAddress(String),

	#[error("synchronization already in progress")]
	SyncAlreadyInProgress,

	#[error("wallet has not been loaded")]
	WalletNotLoaded,

	#[error("wallet does not exist")]
	WalletNotExist,

	#[error("wallet already exists")]
	WalletExists,

	#[error("wallet is locked")]
	WalletLocked,

	#[error("invalid passphrase")]
	InvalidPassphrase,

	#[error("not connected to a network backend")]
	NotConnected,

	#[error("invalid operation: rescan already in progress")]
	Invalid,

	#[error("context canceled")]
	ContextCanceled,

	#[error("network backend unavailable: {0}")]
	Unavailable(String),

	#[error("invalid RPC credentials")]
	InvalidAuth,

	#[error("tx index db initialization failed: {0}")]
	TxIndex(String),

	#[error("wallet error: {0}")]
	Wallet(WalletError),

	#[error("Sync error: {0}")]
	Sync(#[from] RunError),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Logging error: {0}")]
	Logging(String),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Map a collaborator failure onto the sync layer's taxonomy.
pub fn translate_error(err: WalletError) -> WalletSyncError {
	match err {
		WalletError::InvalidPassphrase => WalletSyncError::InvalidPassphrase,
		WalletError::NotExist => WalletSyncError::WalletNotExist,
		WalletError::AlreadyExists => WalletSyncError::WalletExists,
		WalletError::Locked => WalletSyncError::WalletLocked,
		WalletError::Canceled => WalletSyncError::ContextCanceled,
		other => WalletSyncError::Wallet(other),
	}
}

impl From<WalletError> for WalletSyncError {
	fn from(err: WalletError) -> Self {
		translate_error(err)
	}
}

pub type Result<T> = std::result::Result<T, WalletSyncError>;

/// Tip of the wallet's main chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
	pub hash: String,
	pub height: i32,
}

/// Selects a block for [`crate::wallet::interface::Wallet::block_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockIdentifier {
	Height(i32),
	Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
	pub hash: String,
	pub height: i32,
	/// Block header timestamp in seconds since the Unix epoch.
	pub timestamp: i64,
}

/// One item of rescan progress: the height scanned through, or the failure that ended the scan.
pub type RescanProgress = std::result::Result<i32, WalletError>;
