//! Sync session: ownership of the attached backend and its background run loop.
//!
//! A session moves through `Idle -> Starting -> Running -> {Synced} -> Idle`. Starting is
//! guarded so a wallet never has more than one attached backend. Once running, the backend's
//! run loop executes on a spawned task under a cancellable token; when it returns, the backend
//! is detached, the outcome is classified and reported to listeners, and the session is idle
//! again.

use crate::backend::{NetworkBackend, RunError};
use crate::shutdown;
use crate::wallet::interface::{Wallet, WalletLoader};
use crate::wallet::sync::events::{ProgressBroadcaster, SyncErrorCode};
use crate::wallet::sync::notifications::SyncNotifications;
use crate::wallet::sync::strategies::{Backend, BackendConfig, BackendSelector};
use crate::wallet::types::{Result, WalletSyncError};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lifecycle state of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Idle,
    /// A start request passed its guards and the backend is being built.
    Starting,
    Running,
    /// The backend reported that the wallet caught up with the chain.
    Synced,
    /// The run loop ended with an error; the backend is being detached.
    Errored,
    /// The run loop was cancelled; the backend is being detached.
    Canceled,
}

impl SyncState {
    /// Whether a backend is attached or about to be.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SyncState::Starting | SyncState::Running | SyncState::Synced
        )
    }
}

/// How a session's run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The run loop returned without error.
    Completed,
    Canceled,
    Errored { code: SyncErrorCode, message: String },
}

impl SyncOutcome {
    fn from_run(result: std::result::Result<(), RunError>) -> Self {
        match result {
            Ok(()) => SyncOutcome::Completed,
            Err(RunError::Canceled) => SyncOutcome::Canceled,
            Err(e @ RunError::DeadlineExceeded) => SyncOutcome::Errored {
                code: SyncErrorCode::DeadlineExceeded,
                message: e.to_string(),
            },
            Err(e @ RunError::Other(_)) => SyncOutcome::Errored {
                code: SyncErrorCode::Unclassified,
                message: e.to_string(),
            },
        }
    }

    fn state(&self) -> SyncState {
        match self {
            SyncOutcome::Completed => SyncState::Idle,
            SyncOutcome::Canceled => SyncState::Canceled,
            SyncOutcome::Errored { .. } => SyncState::Errored,
        }
    }
}

/// Handle to a running sync session's background task.
///
/// Dropping the handle leaves the task running; its outcome is still reported to listeners.
pub struct SyncTask {
    handle: JoinHandle<SyncOutcome>,
}

impl SyncTask {
    /// Wait for the run loop to end and the backend to be detached.
    pub async fn outcome(self) -> SyncOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Errored {
                code: SyncErrorCode::Unclassified,
                message: format!("sync task failed: {}", e),
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Default)]
struct SessionSlot {
    backend: Option<Backend>,
    cancel: Option<CancellationToken>,
}

/// Owner of the wallet's single network backend attachment.
pub struct SyncSession {
    loader: Arc<dyn WalletLoader>,
    selector: BackendSelector,
    broadcaster: Arc<ProgressBroadcaster>,
    slot: Arc<Mutex<SessionSlot>>,
    state: Arc<watch::Sender<SyncState>>,
}

impl SyncSession {
    pub fn new(
        loader: Arc<dyn WalletLoader>,
        selector: BackendSelector,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            loader,
            selector,
            broadcaster,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Name of the attached backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.lock_slot().backend.as_ref().map(Backend::name)
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Build, attach and launch the backend described by `config`.
    ///
    /// Validation and connection failures are returned here, before any background work
    /// starts. Failures of the run loop itself are only reported to listeners and through the
    /// returned [`SyncTask`].
    pub async fn start(&self, config: &BackendConfig) -> Result<SyncTask> {
        let wallet = self.begin_start()?;
        let guard = StartGuard {
            session: self,
            armed: true,
        };
        info!("Starting {:?} sync", config);

        let token = shutdown::child_token();
        self.lock_slot().cancel = Some(token.clone());

        let notifications = SyncNotifications::new(
            self.broadcaster.clone(),
            self.state.clone(),
            config.reports_peers(),
        );
        let backend = match self
            .selector
            .build(wallet.clone(), config, &token, notifications)
            .await
        {
            Ok(backend) => backend,
            Err(e) => {
                warn!("Failed to start sync: {}", e);
                return Err(e);
            }
        };

        guard.disarm();
        Ok(self.launch(wallet, backend, token))
    }

    /// Cancel the running session, if any, and tell listeners the wallet is no longer synced.
    ///
    /// Returns immediately; the backend is detached once its run loop has observed the
    /// cancellation.
    pub fn cancel(&self) {
        if let Some(token) = self.lock_slot().cancel.as_ref() {
            info!("Cancelling sync");
            token.cancel();
        }
        self.broadcaster.synced(false);
    }

    /// Cancel the running session without notifying listeners.
    pub(crate) fn cancel_quietly(&self) {
        if let Some(token) = self.lock_slot().cancel.as_ref() {
            token.cancel();
        }
    }

    /// Guard for `Idle -> Starting`.
    fn begin_start(&self) -> Result<Arc<dyn Wallet>> {
        let wallet = self
            .loader
            .loaded_wallet()
            .ok_or(WalletSyncError::WalletNotLoaded)?;

        let _slot = self.lock_slot();
        if self.state().is_active() || wallet.network_backend().is_some() {
            return Err(WalletSyncError::SyncAlreadyInProgress);
        }
        self.state.send_replace(SyncState::Starting);
        Ok(wallet)
    }

    /// `Starting -> Idle` for a start that failed or was abandoned before launch.
    fn abort_start(&self) {
        let mut slot = self.lock_slot();
        if let Some(token) = slot.cancel.take() {
            token.cancel();
        }
        slot.backend = None;
        self.state.send_replace(SyncState::Idle);
    }

    /// `Starting -> Running`: attach the backend and spawn its run loop.
    fn launch(&self, wallet: Arc<dyn Wallet>, backend: Backend, token: CancellationToken) -> SyncTask {
        let network_backend = backend.network_backend();
        {
            let mut slot = self.lock_slot();
            wallet.set_network_backend(Some(network_backend.clone()));
            self.loader.set_network_backend(Some(network_backend));
            slot.backend = Some(backend.clone());
            self.state.send_replace(SyncState::Running);
        }

        if !backend.reports_peers() {
            // Peer counts are not available from this backend
            self.broadcaster.peer_disconnected(-1);
        }

        let run = RunLoop {
            wallet,
            loader: self.loader.clone(),
            broadcaster: self.broadcaster.clone(),
            slot: self.slot.clone(),
            state: self.state.clone(),
            rpc_cache: self.selector.rpc_cache().clone(),
        };
        SyncTask {
            handle: tokio::spawn(run.run(backend, token)),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the session to `Idle` unless the start reaches [`SyncSession::launch`], including
/// when the `start` future is dropped while the backend is being built.
struct StartGuard<'a> {
    session: &'a SyncSession,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abort_start();
        }
    }
}

/// State the background task needs once the starting call has returned.
struct RunLoop {
    wallet: Arc<dyn Wallet>,
    loader: Arc<dyn WalletLoader>,
    broadcaster: Arc<ProgressBroadcaster>,
    slot: Arc<Mutex<SessionSlot>>,
    state: Arc<watch::Sender<SyncState>>,
    rpc_cache: crate::backend::RpcClientCache,
}

impl RunLoop {
    async fn run(self, backend: Backend, token: CancellationToken) -> SyncOutcome {
        let result = backend.run(token).await;
        let outcome = SyncOutcome::from_run(result.clone());
        self.state.send_replace(outcome.state());

        if matches!(outcome, SyncOutcome::Errored { .. }) && matches!(backend, Backend::Rpc { .. }) {
            self.rpc_cache.invalidate();
        }
        self.detach();

        match (&outcome, result) {
            (SyncOutcome::Completed, _) => {
                info!("{} synchronization stopped", backend.name());
            }
            (SyncOutcome::Canceled, Err(e)) => {
                info!("{} synchronization canceled: {}", backend.name(), e);
                self.broadcaster.sync_error(SyncErrorCode::Canceled, &e);
            }
            (SyncOutcome::Errored { code, .. }, Err(e)) => {
                error!("{} synchronization failed: {}", backend.name(), e);
                self.broadcaster.sync_error(*code, &e);
            }
            (_, Ok(())) => {}
        }

        outcome
    }

    /// Release the backend from the wallet, the loader and the session, and go idle.
    fn detach(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.backend = None;
        slot.cancel = None;
        let none: Option<Arc<dyn NetworkBackend>> = None;
        self.wallet.set_network_backend(none.clone());
        self.loader.set_network_backend(none);
        self.state.send_replace(SyncState::Idle);
    }
}
