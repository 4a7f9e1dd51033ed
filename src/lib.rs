//! Wallet synchronization orchestration.
//!
//! This crate brings a wallet's view of the blockchain up to date through one of two
//! interchangeable backends: an SPV peer-to-peer syncer or a trusted RPC connection. It owns
//! the lifecycle of the attached backend, fans progress out to registered listeners and drives
//! cancellable rescans.
//!
//! The wallet itself, the wire protocols and the transaction index database are external
//! collaborators. They are consumed through the traits in [`wallet::interface`] and [`backend`].

pub mod backend;
pub mod config;
pub mod logging;
pub mod shutdown;
mod utils;
pub mod wallet;

pub use backend::{
    AddressError, BackendFactory, NetworkBackend, RpcClient, RpcConnectError, RpcConnectParams,
    RpcSyncer, RunError, SpvSyncer, normalize_address,
};
pub use config::{NetworkParams, WalletSyncConfig};
pub use utils::{Passphrase, decode_seed};
pub use wallet::*;
