use crate::backend::{
	BackendFactory, NetworkBackend, RpcClient, RpcClientCache, RpcConnectError, RpcConnectParams,
	RpcSyncer, RunError, SpvSyncer, normalize_address,
};
use crate::config::NetworkParams;
use crate::wallet::interface::Wallet;
use crate::wallet::sync::events::{ProgressBroadcaster, SyncErrorCode};
use crate::wallet::sync::notifications::SyncNotifications;
use crate::wallet::types::{Result, WalletSyncError};

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the wallet should reach the network.
#[derive(Clone)]
pub enum BackendConfig {
	/// Peer-to-peer sync, optionally restricted to the given peers.
	Spv { peers: Vec<String> },
	/// Sync through a trusted full node's RPC server.
	Rpc {
		address: String,
		username: String,
		password: String,
		certificate: Option<Vec<u8>>,
	},
}

impl BackendConfig {
	/// SPV configuration from a semicolon-delimited peer list. Blank entries are ignored.
	pub fn spv(peer_addresses: &str) -> Self {
		let peers = peer_addresses
			.split(';')
			.map(str::trim)
			.filter(|peer| !peer.is_empty())
			.map(str::to_string)
			.collect();
		BackendConfig::Spv { peers }
	}

	pub fn rpc(address: &str, username: &str, password: &str, certificate: &[u8]) -> Self {
		BackendConfig::Rpc {
			address: address.to_string(),
			username: username.to_string(),
			password: password.to_string(),
			certificate: (!certificate.is_empty()).then(|| certificate.to_vec()),
		}
	}

	/// Whether backends of this kind report connected peer counts.
	pub fn reports_peers(&self) -> bool {
		matches!(self, BackendConfig::Spv { .. })
	}
}

impl fmt::Debug for BackendConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BackendConfig::Spv { peers } => f.debug_struct("Spv").field("peers", peers).finish(),
			BackendConfig::Rpc {
				address,
				username,
				certificate,
				..
			} => f
				.debug_struct("Rpc")
				.field("address", address)
				.field("username", username)
				.field("tls", &certificate.is_some())
				.finish_non_exhaustive(),
		}
	}
}

/// The synchronization strategy attached to a wallet.
#[derive(Clone)]
pub enum Backend {
	Spv(Arc<dyn SpvSyncer>),
	Rpc {
		syncer: Arc<dyn RpcSyncer>,
		client: Arc<dyn RpcClient>,
	},
}

impl Backend {
	pub fn name(&self) -> &'static str {
		match self {
			Backend::Spv(_) => "SPV",
			Backend::Rpc { .. } => "RPC",
		}
	}

	/// Chain access handle attached to the wallet and its loader.
	pub fn network_backend(&self) -> Arc<dyn NetworkBackend> {
		match self {
			Backend::Spv(syncer) => syncer.network_backend(),
			Backend::Rpc { client, .. } => client.network_backend(),
		}
	}

	pub fn reports_peers(&self) -> bool {
		matches!(self, Backend::Spv(_))
	}

	/// Drive the backend's synchronization loop until it returns.
	pub async fn run(&self, token: CancellationToken) -> std::result::Result<(), RunError> {
		match self {
			Backend::Spv(syncer) => syncer.run(token).await,
			Backend::Rpc { syncer, .. } => syncer.run(token, true).await,
		}
	}
}

/// Builds and validates backends from a [`BackendConfig`].
pub struct BackendSelector {
	network: NetworkParams,
	factory: Arc<dyn BackendFactory>,
	broadcaster: Arc<ProgressBroadcaster>,
	rpc_cache: RpcClientCache,
}

impl BackendSelector {
	pub fn new(
		network: NetworkParams,
		factory: Arc<dyn BackendFactory>,
		broadcaster: Arc<ProgressBroadcaster>,
	) -> Self {
		Self {
			network,
			factory,
			broadcaster,
			rpc_cache: RpcClientCache::new(),
		}
	}

	pub fn rpc_cache(&self) -> &RpcClientCache {
		&self.rpc_cache
	}

	/// Build the backend described by `config` for `wallet`.
	///
	/// RPC backends connect before returning; the connection attempt is aborted when `token`
	/// is cancelled.
	pub async fn build(
		&self,
		wallet: Arc<dyn Wallet>,
		config: &BackendConfig,
		token: &CancellationToken,
		notifications: SyncNotifications,
	) -> Result<Backend> {
		match config {
			BackendConfig::Spv { peers } => {
				let peers = self.normalize_peers(peers)?;
				let syncer = self.factory.spv_syncer(wallet, &self.network);
				syncer.set_notifications(notifications);
				if !peers.is_empty() {
					info!("Using {} persistent SPV peers", peers.len());
					syncer.set_persistent_peers(peers);
				}
				Ok(Backend::Spv(syncer))
			}
			BackendConfig::Rpc {
				address,
				username,
				password,
				certificate,
			} => {
				let client = self
					.connect_rpc(
						token,
						address,
						username,
						password,
						certificate.as_deref().unwrap_or_default(),
					)
					.await?;
				let syncer = self.factory.rpc_syncer(wallet, client.clone());
				syncer.set_notifications(notifications);
				Ok(Backend::Rpc { syncer, client })
			}
		}
	}

	/// Normalize SPV peers against the network's default port.
	///
	/// Invalid peers are skipped and reported to listeners; the call only fails when peers were
	/// given and none of them is valid.
	pub fn normalize_peers(&self, peers: &[String]) -> Result<Vec<String>> {
		if peers.is_empty() {
			return Ok(Vec::new());
		}

		let mut valid = Vec::with_capacity(peers.len());
		for peer in peers {
			match normalize_address(peer, self.network.default_port) {
				Ok(address) => valid.push(address),
				Err(e) => {
					warn!("SPV peer address invalid: {}", e);
					self.broadcaster
						.sync_error(SyncErrorCode::InvalidPeerAddress, &e);
				}
			}
		}

		if valid.is_empty() {
			return Err(WalletSyncError::InvalidPeers);
		}
		Ok(valid)
	}

	/// Return the cached RPC client, or connect a new one and cache it.
	pub async fn connect_rpc(
		&self,
		token: &CancellationToken,
		address: &str,
		username: &str,
		password: &str,
		certificate: &[u8],
	) -> Result<Arc<dyn RpcClient>> {
		if let Some(client) = self.rpc_cache.cached() {
			debug!("Reusing cached RPC client");
			return Ok(client);
		}

		let address = normalize_address(address, self.network.rpc_client_port)
			.map_err(|e| WalletSyncError::InvalidAddress(e.to_string()))?;
		let params = RpcConnectParams {
			network: self.network.clone(),
			address,
			username: username.to_string(),
			password: password.to_string(),
			certificate: certificate.to_vec(),
			disable_tls: certificate.is_empty(),
		};

		info!("Connecting to RPC server at {}", params.address);
		let client = self.factory.rpc_client(&params)?;

		if let Err(e) = client.start(token.clone(), false).await {
			warn!("RPC connection to {} failed: {}", params.address, e);
			return Err(classify_connect_error(e, token));
		}

		info!("Connected to RPC server at {}", params.address);
		Ok(self.rpc_cache.store(client))
	}
}

fn classify_connect_error(err: RpcConnectError, token: &CancellationToken) -> WalletSyncError {
	match err {
		RpcConnectError::InvalidAuth => WalletSyncError::InvalidAuth,
		RpcConnectError::Canceled => WalletSyncError::ContextCanceled,
		RpcConnectError::Other(_) if token.is_cancelled() => WalletSyncError::ContextCanceled,
		RpcConnectError::Other(msg) => WalletSyncError::Unavailable(msg),
	}
}
