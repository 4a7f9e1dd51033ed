//! Shared test doubles for the wallet sync integration tests.
//!
//! Provides in-memory implementations of the wallet, loader, index store and backends, a
//! listener that records every event, and a `TestEnvironment` that wires them into an
//! orchestrator over a temporary data directory.
#![allow(dead_code)]

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wallet_sync::{
    AddressGenerator, AddressIndexStore, AddressOwnership, BackendFactory, BlockIdentifier,
    BlockInfo, ChainTip, NetworkBackend, NetworkParams, ProgressListener, RescanPhase,
    RescanProgress, RpcClient, RpcConnectError, RpcConnectParams, RpcSyncer, RunError,
    SpvSyncer, SyncErrorCode, SyncNotifications, TxIndex, Wallet, WalletError, WalletLoader,
    WalletSyncConfig, WalletSyncOrchestrator,
};

pub const PRIVATE_PASSPHRASE: &[u8] = b"hunter2";

/// 24-word BIP39 mnemonic for 32 zero bytes of entropy.
pub fn test_mnemonic() -> String {
    let mut words = vec!["abandon"; 23];
    words.push("art");
    words.join(" ")
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub struct FakeBackend(pub &'static str);

impl NetworkBackend for FakeBackend {
    fn name(&self) -> &'static str {
        self.0
    }
}

/// How a `FakeWallet` answers a rescan request.
#[derive(Debug, Clone, Copy)]
pub enum RescanScript {
    /// Report heights `0..=through`, then return.
    Complete { through: i32 },
    /// Report heights `0..=through`, then wait for cancellation.
    UntilCanceled { through: i32 },
    /// Report heights below `height`, then fail.
    FailAt { height: i32 },
}

pub struct FakeWallet {
    locked: AtomicBool,
    private_passphrase: Mutex<Vec<u8>>,
    public_passphrase: Mutex<Vec<u8>>,
    backend: Mutex<Option<Arc<dyn NetworkBackend>>>,
    tip: ChainTip,
    block_time: Mutex<Option<i64>>,
    addresses: AtomicUsize,
    lock_calls: AtomicUsize,
    rescan: Mutex<RescanScript>,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self {
            locked: AtomicBool::new(true),
            private_passphrase: Mutex::new(PRIVATE_PASSPHRASE.to_vec()),
            public_passphrase: Mutex::new(b"public".to_vec()),
            backend: Mutex::new(None),
            tip: ChainTip {
                hash: "00000000000000001f2e3d".to_string(),
                height: 42,
            },
            block_time: Mutex::new(Some(1_700_000_000)),
            addresses: AtomicUsize::new(0),
            lock_calls: AtomicUsize::new(0),
            rescan: Mutex::new(RescanScript::Complete { through: 10 }),
        }
    }
}

impl FakeWallet {
    pub fn with_rescan(script: RescanScript) -> Self {
        let wallet = Self::default();
        *wallet.rescan.lock().unwrap() = script;
        wallet
    }

    pub fn attach(&self, backend: &'static str) {
        *self.backend.lock().unwrap() = Some(Arc::new(FakeBackend(backend)));
    }

    pub fn has_backend(&self) -> bool {
        self.backend.lock().unwrap().is_some()
    }

    pub fn set_block_time(&self, time: Option<i64>) {
        *self.block_time.lock().unwrap() = time;
    }

    pub fn locked_state(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn lock_calls(&self) -> usize {
        self.lock_calls.load(Ordering::SeqCst)
    }

    pub fn private_passphrase(&self) -> Vec<u8> {
        self.private_passphrase.lock().unwrap().clone()
    }

    pub fn public_passphrase(&self) -> Vec<u8> {
        self.public_passphrase.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Wallet for FakeWallet {
    fn locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    fn lock(&self) {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        self.locked.store(true, Ordering::SeqCst);
    }

    fn unlock(&self, passphrase: &[u8]) -> Result<(), WalletError> {
        if *self.private_passphrase.lock().unwrap() != passphrase {
            return Err(WalletError::InvalidPassphrase);
        }
        self.locked.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn change_private_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        let mut current = self.private_passphrase.lock().unwrap();
        if *current != old {
            return Err(WalletError::InvalidPassphrase);
        }
        *current = new.to_vec();
        Ok(())
    }

    fn change_public_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        let mut current = self.public_passphrase.lock().unwrap();
        if *current != old {
            return Err(WalletError::InvalidPassphrase);
        }
        *current = new.to_vec();
        Ok(())
    }

    fn set_network_backend(&self, backend: Option<Arc<dyn NetworkBackend>>) {
        *self.backend.lock().unwrap() = backend;
    }

    fn network_backend(&self) -> Option<Arc<dyn NetworkBackend>> {
        self.backend.lock().unwrap().clone()
    }

    fn main_chain_tip(&self) -> ChainTip {
        self.tip.clone()
    }

    fn block_info(&self, block: BlockIdentifier) -> Result<BlockInfo, WalletError> {
        let BlockIdentifier::Height(height) = block else {
            return Err(WalletError::Other("lookup by hash unsupported".to_string()));
        };
        match *self.block_time.lock().unwrap() {
            Some(timestamp) => Ok(BlockInfo {
                hash: self.tip.hash.clone(),
                height,
                timestamp,
            }),
            None => Err(WalletError::Other(format!("block {} not found", height))),
        }
    }

    fn next_address(&self, account: u32) -> Result<String, WalletError> {
        let index = self.addresses.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Ts{}addr{}", account, index))
    }

    fn have_address(&self, address: &str) -> bool {
        address.starts_with("Ts")
    }

    async fn rescan_progress_from_height(
        &self,
        token: CancellationToken,
        _backend: Arc<dyn NetworkBackend>,
        from_height: i32,
        progress: mpsc::Sender<RescanProgress>,
    ) {
        let script = *self.rescan.lock().unwrap();
        let (through, park) = match script {
            RescanScript::Complete { through } => (through, false),
            RescanScript::UntilCanceled { through } => (through, true),
            RescanScript::FailAt { height } => {
                for h in from_height..height {
                    if progress.send(Ok(h)).await.is_err() {
                        return;
                    }
                }
                let _ = progress
                    .send(Err(WalletError::Other("disk failure".to_string())))
                    .await;
                return;
            }
        };

        for h in from_height..=through {
            if token.is_cancelled() || progress.send(Ok(h)).await.is_err() {
                return;
            }
        }
        if park {
            token.cancelled().await;
        }
    }
}

#[derive(Default)]
pub struct FakeLoader {
    exists: AtomicBool,
    template: Arc<FakeWallet>,
    loaded: Mutex<Option<Arc<FakeWallet>>>,
    backend: Mutex<Option<Arc<dyn NetworkBackend>>>,
    created_with: Mutex<Option<(Vec<u8>, Vec<u8>, Vec<u8>)>>,
}

impl FakeLoader {
    /// A loader whose wallet exists on disk but is not loaded yet.
    pub fn existing(wallet: Arc<FakeWallet>) -> Self {
        Self {
            exists: AtomicBool::new(true),
            template: wallet,
            ..Self::default()
        }
    }

    /// A loader with `wallet` already loaded.
    pub fn loaded(wallet: Arc<FakeWallet>) -> Self {
        let loader = Self::existing(wallet.clone());
        *loader.loaded.lock().unwrap() = Some(wallet);
        loader
    }

    pub fn wallet(&self) -> Arc<FakeWallet> {
        self.template.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().unwrap().is_some()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.lock().unwrap().is_some()
    }

    /// `(public, private, seed)` the wallet was created with.
    pub fn created_with(&self) -> Option<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        self.created_with.lock().unwrap().clone()
    }
}

impl WalletLoader for FakeLoader {
    fn wallet_exists(&self) -> Result<bool, WalletError> {
        Ok(self.exists.load(Ordering::SeqCst))
    }

    fn create_new_wallet(
        &self,
        public_passphrase: &[u8],
        private_passphrase: &[u8],
        seed: &[u8],
    ) -> Result<Arc<dyn Wallet>, WalletError> {
        if self.exists.swap(true, Ordering::SeqCst) {
            return Err(WalletError::AlreadyExists);
        }
        *self.created_with.lock().unwrap() = Some((
            public_passphrase.to_vec(),
            private_passphrase.to_vec(),
            seed.to_vec(),
        ));
        *self.loaded.lock().unwrap() = Some(self.template.clone());
        Ok(self.template.clone())
    }

    fn open_existing_wallet(&self, public_passphrase: &[u8]) -> Result<Arc<dyn Wallet>, WalletError> {
        if !self.exists.load(Ordering::SeqCst) {
            return Err(WalletError::NotExist);
        }
        if self.template.public_passphrase() != public_passphrase {
            return Err(WalletError::InvalidPassphrase);
        }
        *self.loaded.lock().unwrap() = Some(self.template.clone());
        Ok(self.template.clone())
    }

    fn loaded_wallet(&self) -> Option<Arc<dyn Wallet>> {
        self.loaded
            .lock()
            .unwrap()
            .clone()
            .map(|wallet| wallet as Arc<dyn Wallet>)
    }

    fn set_network_backend(&self, backend: Option<Arc<dyn NetworkBackend>>) {
        *self.backend.lock().unwrap() = backend;
    }

    fn unload_wallet(&self) -> Result<(), WalletError> {
        self.loaded.lock().unwrap().take();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTxIndex {
    closed: AtomicBool,
}

impl FakeTxIndex {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TxIndex for FakeTxIndex {
    fn close(&self) -> Result<(), WalletError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeIndexStore {
    pub path: Mutex<Option<PathBuf>>,
    pub first_address: Mutex<Option<String>>,
    pub index: Mutex<Option<Arc<FakeTxIndex>>>,
    pub fail: AtomicBool,
}

impl AddressIndexStore for FakeIndexStore {
    fn initialize(
        &self,
        path: &std::path::Path,
        generate_address: AddressGenerator,
        address_matches_wallet: AddressOwnership,
    ) -> Result<Arc<dyn TxIndex>, WalletError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WalletError::Other("database is locked".to_string()));
        }
        let address = generate_address()?;
        assert!(address_matches_wallet(&address)?);

        *self.path.lock().unwrap() = Some(path.to_path_buf());
        *self.first_address.lock().unwrap() = Some(address);
        let index = Arc::new(FakeTxIndex::default());
        *self.index.lock().unwrap() = Some(index.clone());
        Ok(index)
    }
}

/// SPV syncer that reports `synced(true)` on start and then runs until cancelled, or fails
/// with a scripted error.
pub struct FakeSpvSyncer {
    notifications: Mutex<Option<SyncNotifications>>,
    pub peers: Mutex<Vec<String>>,
    error: Option<RunError>,
    report_synced: bool,
}

#[async_trait::async_trait]
impl SpvSyncer for FakeSpvSyncer {
    fn set_notifications(&self, notifications: SyncNotifications) {
        *self.notifications.lock().unwrap() = Some(notifications);
    }

    fn set_persistent_peers(&self, peers: Vec<String>) {
        *self.peers.lock().unwrap() = peers;
    }

    fn network_backend(&self) -> Arc<dyn NetworkBackend> {
        Arc::new(FakeBackend("SPV"))
    }

    async fn run(&self, token: CancellationToken) -> Result<(), RunError> {
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        let notifications = self.notifications.lock().unwrap().clone();
        if let Some(notifications) = notifications {
            notifications.peer_connected(1);
            if self.report_synced {
                notifications.synced(true);
            }
        }
        token.cancelled().await;
        Err(RunError::Canceled)
    }
}

pub struct FakeRpcClient {
    start_error: Option<RpcConnectError>,
    /// Hold the connect step open until the token is cancelled.
    blocks_until_canceled: bool,
    pub start_calls: AtomicUsize,
    pub retried: AtomicBool,
}

#[async_trait::async_trait]
impl RpcClient for FakeRpcClient {
    async fn start(&self, token: CancellationToken, retry: bool) -> Result<(), RpcConnectError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.retried.store(retry, Ordering::SeqCst);
        if self.blocks_until_canceled {
            token.cancelled().await;
            return Err(RpcConnectError::Canceled);
        }
        match self.start_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn network_backend(&self) -> Arc<dyn NetworkBackend> {
        Arc::new(FakeBackend("RPC"))
    }
}

pub struct FakeRpcSyncer {
    error: Option<RunError>,
    pub discover_addresses: AtomicBool,
}

#[async_trait::async_trait]
impl RpcSyncer for FakeRpcSyncer {
    fn set_notifications(&self, _notifications: SyncNotifications) {}

    async fn run(&self, token: CancellationToken, discover_addresses: bool) -> Result<(), RunError> {
        self.discover_addresses.store(discover_addresses, Ordering::SeqCst);
        if let Some(e) = self.error.clone() {
            return Err(e);
        }
        token.cancelled().await;
        Err(RunError::Canceled)
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub spv_error: Mutex<Option<RunError>>,
    pub spv_reports_synced: AtomicBool,
    pub rpc_start_error: Mutex<Option<RpcConnectError>>,
    pub rpc_start_blocks: AtomicBool,
    pub rpc_run_error: Mutex<Option<RunError>>,
    pub spv_built: AtomicUsize,
    pub rpc_clients_built: AtomicUsize,
    pub rpc_syncers_built: AtomicUsize,
    pub last_spv: Mutex<Option<Arc<FakeSpvSyncer>>>,
    pub last_rpc_syncer: Mutex<Option<Arc<FakeRpcSyncer>>>,
    pub last_rpc_params: Mutex<Option<RpcConnectParams>>,
}

impl FakeFactory {
    pub fn spv_peers(&self) -> Vec<String> {
        self.last_spv
            .lock()
            .unwrap()
            .as_ref()
            .map(|syncer| syncer.peers.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl BackendFactory for FakeFactory {
    fn spv_syncer(&self, _wallet: Arc<dyn Wallet>, _network: &NetworkParams) -> Arc<dyn SpvSyncer> {
        self.spv_built.fetch_add(1, Ordering::SeqCst);
        let syncer = Arc::new(FakeSpvSyncer {
            notifications: Mutex::new(None),
            peers: Mutex::new(Vec::new()),
            error: self.spv_error.lock().unwrap().clone(),
            report_synced: self.spv_reports_synced.load(Ordering::SeqCst),
        });
        *self.last_spv.lock().unwrap() = Some(syncer.clone());
        syncer
    }

    fn rpc_client(&self, params: &RpcConnectParams) -> Result<Arc<dyn RpcClient>, WalletError> {
        self.rpc_clients_built.fetch_add(1, Ordering::SeqCst);
        *self.last_rpc_params.lock().unwrap() = Some(params.clone());
        Ok(Arc::new(FakeRpcClient {
            start_error: self.rpc_start_error.lock().unwrap().clone(),
            blocks_until_canceled: self.rpc_start_blocks.load(Ordering::SeqCst),
            start_calls: AtomicUsize::new(0),
            retried: AtomicBool::new(false),
        }))
    }

    fn rpc_syncer(&self, _wallet: Arc<dyn Wallet>, _client: Arc<dyn RpcClient>) -> Arc<dyn RpcSyncer> {
        self.rpc_syncers_built.fetch_add(1, Ordering::SeqCst);
        let syncer = Arc::new(FakeRpcSyncer {
            error: self.rpc_run_error.lock().unwrap().clone(),
            discover_addresses: AtomicBool::new(false),
        });
        *self.last_rpc_syncer.lock().unwrap() = Some(syncer.clone());
        syncer
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PeerConnected(i32),
    PeerDisconnected(i32),
    Rescan(i32, RescanPhase),
    Synced(bool),
    SyncError(i32, String),
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    pub fn error_codes(&self) -> Vec<i32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::SyncError(code, _) => Some(code),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressListener for RecordingListener {
    fn on_peer_connected(&self, peer_count: i32) {
        self.push(Event::PeerConnected(peer_count));
    }

    fn on_peer_disconnected(&self, peer_count: i32) {
        self.push(Event::PeerDisconnected(peer_count));
    }

    fn on_rescan(&self, scanned_height: i32, phase: RescanPhase) {
        self.push(Event::Rescan(scanned_height, phase));
    }

    fn on_synced(&self, synced: bool) {
        self.push(Event::Synced(synced));
    }

    fn on_sync_error(&self, code: SyncErrorCode, error: &(dyn StdError + Send + Sync)) {
        self.push(Event::SyncError(code.code(), error.to_string()));
    }
}

/// Orchestrator over a temporary data directory, with its collaborators kept for inspection.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub loader: Arc<FakeLoader>,
    pub index_store: Arc<FakeIndexStore>,
    pub factory: Arc<FakeFactory>,
    pub listener: Arc<RecordingListener>,
    pub orchestrator: WalletSyncOrchestrator,
}

impl TestEnvironment {
    pub fn new(loader: FakeLoader) -> Self {
        Self::with_factory(loader, FakeFactory::default())
    }

    pub fn with_factory(loader: FakeLoader, factory: FakeFactory) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let loader = Arc::new(loader);
        let index_store = Arc::new(FakeIndexStore::default());
        let factory = Arc::new(factory);
        let listener = Arc::new(RecordingListener::default());

        let config = WalletSyncConfig::new(temp_dir.path(), NetworkParams::testnet3());
        let orchestrator = WalletSyncOrchestrator::new(
            config,
            loader.clone(),
            index_store.clone(),
            factory.clone(),
        )
        .expect("Failed to create orchestrator");
        orchestrator.add_sync_progress_listener(listener.clone());

        Self {
            temp_dir,
            loader,
            index_store,
            factory,
            listener,
            orchestrator,
        }
    }

    pub fn wallet(&self) -> Arc<FakeWallet> {
        self.loader.wallet()
    }
}
