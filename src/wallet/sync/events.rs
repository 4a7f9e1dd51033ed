//! Progress events and their fan-out to listeners.
//!
//! Sync sessions, rescans and the backends' notification callbacks report milestones through
//! the [`ProgressBroadcaster`], which delivers every event to each registered
//! [`ProgressListener`] in registration order. Listeners are expected to return quickly and not
//! panic; a listener that does panic is logged and skipped so the remaining listeners still
//! receive the event.

use std::error::Error as StdError;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::error;

/// Stage reported alongside rescan heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RescanPhase {
    Progress,
    Finish,
}

/// Classification of errors delivered through [`ProgressListener::on_sync_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorCode {
    /// The run loop ended with an error that is neither cancellation nor a deadline.
    Unclassified,
    /// The sync context was cancelled.
    Canceled,
    DeadlineExceeded,
    /// A configured peer address was skipped during normalization. Not fatal.
    InvalidPeerAddress,
    /// A rescan stopped on an error reported by the wallet.
    RescanFailed,
}

impl SyncErrorCode {
    /// Numeric code exposed to bindings.
    pub fn code(self) -> i32 {
        match self {
            SyncErrorCode::Unclassified => -1,
            SyncErrorCode::Canceled => 1,
            SyncErrorCode::DeadlineExceeded => 2,
            SyncErrorCode::InvalidPeerAddress => 3,
            SyncErrorCode::RescanFailed => 4,
        }
    }

    /// Whether the error leaves the session in a terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SyncErrorCode::InvalidPeerAddress)
    }
}

impl fmt::Display for SyncErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Observer of sync and rescan milestones.
///
/// Callbacks run synchronously on the task that produced the event, so implementations must
/// not block.
pub trait ProgressListener: Send + Sync {
    fn on_peer_connected(&self, _peer_count: i32) {}

    /// `peer_count` is `-1` when the active backend cannot report peers.
    fn on_peer_disconnected(&self, _peer_count: i32) {}

    fn on_rescan(&self, _scanned_height: i32, _phase: RescanPhase) {}

    fn on_synced(&self, _synced: bool) {}

    fn on_sync_error(&self, _code: SyncErrorCode, _error: &(dyn StdError + Send + Sync)) {}

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered, append-only set of listeners.
#[derive(Default)]
pub struct ProgressBroadcaster {
    listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are never removed.
    pub fn register(&self, listener: Arc<dyn ProgressListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn peer_connected(&self, peer_count: i32) {
        self.dispatch(|l| l.on_peer_connected(peer_count));
    }

    pub fn peer_disconnected(&self, peer_count: i32) {
        self.dispatch(|l| l.on_peer_disconnected(peer_count));
    }

    pub fn rescan(&self, scanned_height: i32, phase: RescanPhase) {
        self.dispatch(|l| l.on_rescan(scanned_height, phase));
    }

    pub fn synced(&self, synced: bool) {
        self.dispatch(|l| l.on_synced(synced));
    }

    pub fn sync_error(&self, code: SyncErrorCode, err: &(dyn StdError + Send + Sync)) {
        self.dispatch(|l| l.on_sync_error(code, err));
    }

    /// Deliver an event to every listener in registration order.
    ///
    /// The list is snapshotted first so listeners may register further listeners from inside a
    /// callback; those only see subsequent events.
    fn dispatch(&self, event: impl Fn(&dyn ProgressListener)) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| event(listener.as_ref()))).is_err() {
                error!("Listener {} panicked while handling a progress event", listener.name());
                // Continue with the remaining listeners
            }
        }
    }
}
