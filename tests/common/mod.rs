//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, b256, Address, TxHash};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use wallet_demo::bridge::{BridgeSettings, WalletBridge};
use wallet_demo::config::DemoConfig;
use wallet_demo::provider::{
    AddChainParams, Confirmation, EventKind, ListenerId, ListenerRegistry, NetworkInfo,
    ProviderError, ProviderEvent, ProviderResult, SubmittedTransaction, TransactionSigner,
    TransferRequest, WalletProvider,
};

pub const ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const SECOND_ACCOUNT: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const TX_HASH: TxHash =
    b256!("deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");

/// How long each fake provider request stays in flight.
const REQUEST_LATENCY: Duration = Duration::from_millis(5);

/// Counts provider requests running at the same time.
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    /// Mark a request as started, then hold it open for a little while so
    /// unserialized callers would overlap.
    pub async fn hold(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard(self.clone());
        tokio::time::sleep(REQUEST_LATENCY).await;
        guard
    }

    /// Highest number of requests seen in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory wallet with call counters and scripted answers.
#[derive(Default)]
pub struct FakeProvider {
    pub accounts: Mutex<Vec<Address>>,
    pub chain_id: AtomicU64,
    /// Rejection code returned by `switch_chain`, if any.
    pub switch_error: Mutex<Option<i64>>,
    /// Error returned by `send_transaction`, as a rejection code.
    pub send_error: Mutex<Option<i64>>,
    pub listeners: ListenerRegistry,

    pub request_accounts_calls: AtomicUsize,
    pub network_calls: AtomicUsize,
    pub signer_calls: AtomicUsize,
    pub switch_calls: AtomicUsize,
    pub add_chain_calls: AtomicUsize,
    pub remove_listener_calls: AtomicUsize,
    pub added_chains: Mutex<Vec<AddChainParams>>,
    /// Confirmations not yet resolved, in submission order.
    pub pending_confirmations: Arc<Mutex<Vec<oneshot::Sender<Confirmation>>>>,
    pub in_flight: Arc<InFlight>,
}

impl FakeProvider {
    pub fn with_accounts(accounts: Vec<Address>) -> Arc<Self> {
        let provider = Self::default();
        *provider.accounts.lock() = accounts;
        provider.chain_id.store(11_155_111, Ordering::SeqCst);
        Arc::new(provider)
    }

    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.listeners.emit(event)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Resolve the oldest outstanding confirmation.
    pub fn confirm_next(&self, block_number: u64) -> bool {
        let mut pending = self.pending_confirmations.lock();
        if pending.is_empty() {
            return false;
        }
        let tx = pending.remove(0);
        tx.send(Confirmation {
            block_number: Some(block_number),
            success: true,
        })
        .is_ok()
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request_accounts_calls.fetch_add(1, Ordering::SeqCst);
        let _held = self.in_flight.hold().await;
        Ok(self.accounts.lock().clone())
    }

    async fn chain_id(&self) -> ProviderResult<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn network(&self) -> ProviderResult<NetworkInfo> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        let _held = self.in_flight.hold().await;
        Ok(NetworkInfo::from_chain_id(self.chain_id.load(Ordering::SeqCst)))
    }

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        let _held = self.in_flight.hold().await;
        if let Some(code) = *self.switch_error.lock() {
            return Err(ProviderError::rejected(code, "switch refused"));
        }
        self.chain_id.store(chain_id, Ordering::SeqCst);
        self.listeners.emit(ProviderEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> ProviderResult<()> {
        self.add_chain_calls.fetch_add(1, Ordering::SeqCst);
        let _held = self.in_flight.hold().await;
        self.added_chains.lock().push(params.clone());
        Ok(())
    }

    async fn signer(&self) -> ProviderResult<Arc<dyn TransactionSigner>> {
        self.signer_calls.fetch_add(1, Ordering::SeqCst);
        let _held = self.in_flight.hold().await;
        let address = self
            .accounts
            .lock()
            .first()
            .copied()
            .ok_or_else(|| ProviderError::Signer("no account".to_string()))?;
        Ok(Arc::new(FakeSigner {
            address,
            send_error: *self.send_error.lock(),
            pending: self.pending_confirmations.clone(),
            in_flight: self.in_flight.clone(),
        }))
    }

    fn add_listener(&self, kind: EventKind, sender: UnboundedSender<ProviderEvent>) -> ListenerId {
        self.listeners.add(kind, sender)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.remove_listener_calls.fetch_add(1, Ordering::SeqCst);
        self.listeners.remove(id)
    }
}

pub struct FakeSigner {
    address: Address,
    send_error: Option<i64>,
    pending: Arc<Mutex<Vec<oneshot::Sender<Confirmation>>>>,
    in_flight: Arc<InFlight>,
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, _request: TransferRequest) -> ProviderResult<SubmittedTransaction> {
        let _held = self.in_flight.hold().await;
        if let Some(code) = self.send_error {
            return Err(ProviderError::rejected(code, "User denied transaction signature"));
        }
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push(tx);
        Ok(SubmittedTransaction {
            hash: TX_HASH,
            confirmation: Box::pin(async move {
                rx.await
                    .map_err(|_| ProviderError::Disconnected("confirmation dropped".to_string()))
            }),
        })
    }
}

pub fn settings() -> BridgeSettings {
    BridgeSettings::from_config(&DemoConfig::default()).unwrap()
}

/// A bridge around `provider` with its event subscription installed.
pub fn subscribed_bridge(provider: Arc<FakeProvider>) -> Arc<WalletBridge> {
    let bridge = Arc::new(WalletBridge::new(Some(provider), settings()));
    assert!(bridge.subscribe());
    bridge
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
