//! Rescans driven over the attached network backend.
//!
//! A rescan walks the chain from height 0 through the wallet's
//! `rescan_progress_from_height`, consuming its progress over a bounded channel and fanning it
//! out to listeners. It runs on its own task and token, independent of the sync session, and
//! always ends with exactly one terminal event: `on_rescan(height, Finish)`, a final
//! `on_rescan(height, Progress)` when cancelled, or `on_sync_error(RescanFailed, ..)`.

use crate::shutdown;
use crate::wallet::interface::WalletLoader;
use crate::wallet::sync::events::{ProgressBroadcaster, RescanPhase, SyncErrorCode};
use crate::wallet::sync::progress_tracker::RescanProgressTracker;
use crate::wallet::types::{Result, WalletError, WalletSyncError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const RESCAN_START_HEIGHT: i32 = 0;

/// How a rescan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescanOutcome {
    Finished { scanned_through: i32 },
    Canceled { scanned_through: i32 },
    Failed { scanned_through: i32, error: WalletError },
}

/// Handle to a running rescan.
pub struct RescanTask {
    handle: JoinHandle<RescanOutcome>,
}

impl RescanTask {
    pub async fn outcome(self) -> RescanOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => RescanOutcome::Failed {
                scanned_through: RESCAN_START_HEIGHT,
                error: WalletError::Other(format!("rescan task failed: {}", e)),
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Clears the running flag and the cancellation slot when the rescan task exits, whichever
/// path it exits through.
struct RescanGuard {
    running: Arc<AtomicBool>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl Drop for RescanGuard {
    fn drop(&mut self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Starts and cancels rescans; at most one runs at a time.
pub struct RescanController {
    loader: Arc<dyn WalletLoader>,
    broadcaster: Arc<ProgressBroadcaster>,
    running: Arc<AtomicBool>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
    channel_capacity: usize,
}

impl RescanController {
    pub fn new(
        loader: Arc<dyn WalletLoader>,
        broadcaster: Arc<ProgressBroadcaster>,
        channel_capacity: usize,
    ) -> Self {
        Self {
            loader,
            broadcaster,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(Mutex::new(None)),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a rescan from height 0 over the wallet's attached backend.
    pub fn start(&self) -> Result<RescanTask> {
        let wallet = self
            .loader
            .loaded_wallet()
            .ok_or(WalletSyncError::WalletNotLoaded)?;
        let backend = wallet
            .network_backend()
            .ok_or(WalletSyncError::NotConnected)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(WalletSyncError::Invalid);
        }
        let guard = RescanGuard {
            running: self.running.clone(),
            cancel: self.cancel.clone(),
        };

        let token = shutdown::child_token();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        info!("Starting rescan from height {} using {}", RESCAN_START_HEIGHT, backend.name());
        let (progress_tx, progress_rx) = mpsc::channel(self.channel_capacity);

        let producer_token = token.clone();
        tokio::spawn(async move {
            wallet
                .rescan_progress_from_height(producer_token, backend, RESCAN_START_HEIGHT, progress_tx)
                .await;
        });

        let broadcaster = self.broadcaster.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            consume_progress(progress_rx, token, &broadcaster).await
        });

        Ok(RescanTask { handle })
    }

    /// Cancel the running rescan, if any. Does not wait for it to stop.
    pub fn cancel(&self) {
        if let Some(token) = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            info!("Cancelling rescan");
            token.cancel();
        }
    }
}

async fn consume_progress(
    mut progress: mpsc::Receiver<crate::wallet::types::RescanProgress>,
    token: CancellationToken,
    broadcaster: &ProgressBroadcaster,
) -> RescanOutcome {
    let mut tracker = RescanProgressTracker::new(RESCAN_START_HEIGHT);

    while let Some(item) = progress.recv().await {
        match item {
            Ok(scanned_through) => {
                tracker.record(scanned_through);
                broadcaster.rescan(scanned_through, RescanPhase::Progress);
                tracker.log_progress(false);
            }
            Err(e) => {
                error!("Rescan failed: {}", e);
                token.cancel();
                broadcaster.sync_error(SyncErrorCode::RescanFailed, &e);
                return RescanOutcome::Failed {
                    scanned_through: tracker.scanned_through(),
                    error: e,
                };
            }
        }
    }

    let scanned_through = tracker.scanned_through();
    info!("{}", tracker.get_stats().summary());

    if token.is_cancelled() {
        info!("Rescan canceled at height {}", scanned_through);
        broadcaster.rescan(scanned_through, RescanPhase::Progress);
        RescanOutcome::Canceled { scanned_through }
    } else {
        tracker.log_progress(true);
        broadcaster.rescan(scanned_through, RescanPhase::Finish);
        RescanOutcome::Finished { scanned_through }
    }
}
