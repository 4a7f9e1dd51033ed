//! Tracing subscriber setup for hosts embedding the sync layer.

use crate::wallet::types::WalletSyncError;

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, INFO by default, plus the extra
/// `directives` (e.g. `"wallet_sync=debug"`).
///
/// Fails instead of panicking if a subscriber is already installed.
pub fn init_logging(directives: &[&str]) -> Result<(), WalletSyncError> {
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    for directive in directives {
        let directive = directive
            .parse()
            .map_err(|e| WalletSyncError::Logging(format!("invalid directive {directive:?}: {e}")))?;
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .try_init()
        .map_err(|e| WalletSyncError::Logging(e.to_string()))
}
