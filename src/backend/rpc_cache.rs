use super::RpcClient;

use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Started RPC client shared by every RPC sync of a session.
///
/// Only check-and-set access is exposed: callers either get the cached client or store a newly
/// started one, and a store that loses a race hands back the client that won.
#[derive(Clone, Default)]
pub struct RpcClientCache {
	client: Arc<Mutex<Option<Arc<dyn RpcClient>>>>,
}

impl RpcClientCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// The cached client, if a previous connection succeeded.
	pub fn cached(&self) -> Option<Arc<dyn RpcClient>> {
		self.client
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Cache `client` unless one is already cached, returning whichever client is now cached.
	pub fn store(&self, client: Arc<dyn RpcClient>) -> Arc<dyn RpcClient> {
		let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
		match slot.as_ref() {
			Some(existing) => {
				debug!("RPC client already cached, discarding concurrent connection");
				existing.clone()
			}
			None => {
				*slot = Some(client.clone());
				client
			}
		}
	}

	/// Drop the cached client so the next RPC sync reconnects.
	pub fn invalidate(&self) {
		if self
			.client
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
			.is_some()
		{
			debug!("Invalidated cached RPC client");
		}
	}

	pub fn is_cached(&self) -> bool {
		self.client
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.is_some()
	}
}
