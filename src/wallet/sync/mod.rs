//! Wallet Synchronization Module
//!
//! This module provides the orchestration that keeps a wallet synchronized with the network.
//! It is composed of several submodules, each responsible for a specific aspect of the sync process:
//!
//! - `orchestrator`: The entry point exposed to callers. It wires together the lifecycle, session, rescan and broadcaster.
//! - `session`: Owns the attached backend, its cancellation token and the background run loop.
//! - `strategies`: The SPV and RPC backend variants and the selector that builds and validates them.
//! - `notifications`: Callbacks through which backends report peers and sync milestones.
//! - `rescan`: Cancellable rescans over the attached backend.
//! - `events`: Progress listeners and the broadcaster that fans events out to them.
//! - `progress_tracker`: Tracks rescan progress and logs it periodically.
//!
//! Validation failures are returned to the caller before any background work starts; failures of
//! the background tasks are delivered to listeners and through the returned task handles.

/// Progress listeners and event fan-out
pub mod events;
/// Backend notification callbacks
pub mod notifications;
/// Main coordinator for the wallet sync process
pub mod orchestrator;
/// Tracks rescan progress
pub mod progress_tracker;
/// Cancellable rescans
pub mod rescan;
/// Backend attachment and run loop
pub mod session;
/// SPV and RPC backend strategies
pub mod strategies;

pub use events::{ProgressBroadcaster, ProgressListener, RescanPhase, SyncErrorCode};
pub use notifications::SyncNotifications;
pub use orchestrator::*;
pub use rescan::{RescanController, RescanOutcome, RescanTask};
pub use session::{SyncOutcome, SyncSession, SyncState, SyncTask};
pub use strategies::{Backend, BackendConfig, BackendSelector};
