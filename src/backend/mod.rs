//! Network backend integration.
//!
//! This module defines the capabilities the orchestration layer consumes from the peer-to-peer
//! and RPC synchronization implementations. The wire protocols live outside this crate; they are
//! plugged in through [`BackendFactory`] and driven through the syncer traits below.

/// Peer and server address normalization
mod address;
/// Lock-guarded cache for the started RPC client
mod rpc_cache;

pub use address::{AddressError, normalize_address};
pub use rpc_cache::RpcClientCache;

use crate::config::NetworkParams;
use crate::wallet::interface::Wallet;
use crate::wallet::sync::notifications::SyncNotifications;
use crate::wallet::types::WalletError;

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Chain access handle attached to a wallet while a backend is active.
pub trait NetworkBackend: Send + Sync {
	/// Short name of the backend for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Terminal outcome of a syncer's run loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
	#[error("context canceled")]
	Canceled,

	#[error("context deadline exceeded")]
	DeadlineExceeded,

	#[error("{0}")]
	Other(String),
}

/// Failure raised while starting an RPC client connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcConnectError {
	#[error("invalid RPC credentials")]
	InvalidAuth,

	#[error("connection attempt canceled")]
	Canceled,

	#[error("{0}")]
	Other(String),
}

/// Peer-to-peer (SPV) syncer.
#[async_trait::async_trait]
pub trait SpvSyncer: Send + Sync {
	/// Install the callbacks the syncer reports peer and sync milestones through.
	fn set_notifications(&self, notifications: SyncNotifications);

	/// Restrict the syncer to the given, already normalized, peers.
	fn set_persistent_peers(&self, peers: Vec<String>);

	/// Chain access handle to attach to the wallet.
	fn network_backend(&self) -> Arc<dyn NetworkBackend>;

	/// Run until the token is cancelled or an unrecoverable error occurs.
	async fn run(&self, token: CancellationToken) -> Result<(), RunError>;
}

/// Authenticated client connection to a trusted full node.
#[async_trait::async_trait]
pub trait RpcClient: Send + Sync {
	/// Connect and authenticate. With `retry` unset a single attempt is made.
	async fn start(&self, token: CancellationToken, retry: bool) -> Result<(), RpcConnectError>;

	/// Chain access handle backed by this connection.
	fn network_backend(&self) -> Arc<dyn NetworkBackend>;
}

/// Syncer driving the wallet from a started [`RpcClient`].
#[async_trait::async_trait]
pub trait RpcSyncer: Send + Sync {
	fn set_notifications(&self, notifications: SyncNotifications);

	/// Run until the token is cancelled or the connection fails. `discover_addresses` asks the
	/// syncer to run address discovery and rescan before following the chain.
	async fn run(&self, token: CancellationToken, discover_addresses: bool) -> Result<(), RunError>;
}

/// Connection parameters handed to [`BackendFactory::rpc_client`].
#[derive(Clone)]
pub struct RpcConnectParams {
	pub network: NetworkParams,
	/// Normalized `host:port` of the server.
	pub address: String,
	pub username: String,
	pub password: String,
	pub certificate: Vec<u8>,
	/// Set when no certificate was supplied.
	pub disable_tls: bool,
}

impl fmt::Debug for RpcConnectParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RpcConnectParams")
			.field("network", &self.network.name)
			.field("address", &self.address)
			.field("username", &self.username)
			.field("certificate_len", &self.certificate.len())
			.field("disable_tls", &self.disable_tls)
			.finish_non_exhaustive()
	}
}

/// Constructors for the concrete backend implementations.
pub trait BackendFactory: Send + Sync {
	fn spv_syncer(&self, wallet: Arc<dyn Wallet>, network: &NetworkParams) -> Arc<dyn SpvSyncer>;

	fn rpc_client(&self, params: &RpcConnectParams) -> Result<Arc<dyn RpcClient>, WalletError>;

	fn rpc_syncer(&self, wallet: Arc<dyn Wallet>, client: Arc<dyn RpcClient>) -> Arc<dyn RpcSyncer>;
}
