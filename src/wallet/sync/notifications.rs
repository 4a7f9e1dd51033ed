//! Callbacks handed to backends so they can report sync milestones.

use crate::wallet::sync::events::{ProgressBroadcaster, RescanPhase};
use crate::wallet::sync::session::SyncState;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Bridge from a backend's notifications to the session state and the listeners.
///
/// Backends receive a clone through `set_notifications` and call into it from their own tasks.
#[derive(Clone)]
pub struct SyncNotifications {
    broadcaster: Arc<ProgressBroadcaster>,
    state: Arc<watch::Sender<SyncState>>,
    reports_peers: bool,
}

impl SyncNotifications {
    pub(crate) fn new(
        broadcaster: Arc<ProgressBroadcaster>,
        state: Arc<watch::Sender<SyncState>>,
        reports_peers: bool,
    ) -> Self {
        Self {
            broadcaster,
            state,
            reports_peers,
        }
    }

    pub fn peer_connected(&self, peer_count: i32) {
        if self.reports_peers {
            debug!("Peer connected, {} connected peers", peer_count);
            self.broadcaster.peer_connected(peer_count);
        }
    }

    pub fn peer_disconnected(&self, peer_count: i32) {
        if self.reports_peers {
            debug!("Peer disconnected, {} connected peers", peer_count);
            self.broadcaster.peer_disconnected(peer_count);
        }
    }

    /// The backend caught up with the chain (`true`) or fell behind again (`false`).
    pub fn synced(&self, synced: bool) {
        let changed = self.state.send_if_modified(|state| match (*state, synced) {
            (SyncState::Running, true) => {
                *state = SyncState::Synced;
                true
            }
            (SyncState::Synced, false) => {
                *state = SyncState::Running;
                true
            }
            _ => false,
        });
        if changed {
            info!("Wallet synced: {}", synced);
        }
        self.broadcaster.synced(synced);
    }

    /// Rescan progress reported by the backend while it syncs.
    pub fn rescan_progress(&self, scanned_height: i32) {
        self.broadcaster.rescan(scanned_height, RescanPhase::Progress);
    }

    pub fn rescan_finished(&self, scanned_height: i32) {
        self.broadcaster.rescan(scanned_height, RescanPhase::Finish);
    }
}
