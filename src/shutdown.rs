//! Process-wide shutdown signal.
//!
//! Every sync session and rescan runs under a child of the shutdown token, so requesting
//! shutdown cancels all in-flight background work at once.

use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

static SHUTDOWN: OnceLock<CancellationToken> = OnceLock::new();

/// The root token cancelled by [`request_shutdown`].
pub fn shutdown_token() -> &'static CancellationToken {
    SHUTDOWN.get_or_init(CancellationToken::new)
}

/// A fresh cancellable token that is also cancelled on process shutdown.
pub fn child_token() -> CancellationToken {
    shutdown_token().child_token()
}

pub fn request_shutdown() {
    info!("Shutdown requested, cancelling background sync work");
    shutdown_token().cancel();
}

pub fn shutdown_requested() -> bool {
    shutdown_token().is_cancelled()
}
