//! Provider relayed through the wallet injected into the visitor's browser.
//!
//! # Data Flow
//! ```text
//! Bridge → request(method, params) → outbox + pending[id]
//!     → GET /relay/next (page long-poll) → window.ethereum.request(...)
//!     → POST /relay/result {id, result | error} → pending[id] resolved
//!
//! window.ethereum.on(chainChanged | accountsChanged)
//!     → POST /relay/event → ListenerRegistry → bridge dispatch task
//! ```
//!
//! Approval popups, seed phrases and signing all stay inside the extension;
//! the server only sees request results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, TxHash, U64};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;

use crate::config::{NetworkConfig, ProviderConfig};
use crate::provider::events::ListenerRegistry;
use crate::provider::types::{
    AddChainParams, Confirmation, EventKind, ListenerId, NetworkInfo, ProviderError,
    ProviderEvent, ProviderResult, SubmittedTransaction, TransferRequest,
};
use crate::provider::{TransactionSigner, WalletProvider};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One EIP-1193 call handed to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// The page's answer to a [`RelayRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RelayErrorBody>,
}

/// EIP-1193 `ProviderRpcError` as thrown by the injected provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub code: i64,
    pub message: String,
}

/// A provider event forwarded by the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayNotification {
    ChainChanged(U64),
    AccountsChanged(Vec<Address>),
}

impl From<RelayNotification> for ProviderEvent {
    fn from(notification: RelayNotification) -> Self {
        match notification {
            RelayNotification::ChainChanged(id) => Self::ChainChanged(id.to::<u64>()),
            RelayNotification::AccountsChanged(accounts) => Self::AccountsChanged(accounts),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptFields {
    block_number: Option<U64>,
    status: Option<U64>,
}

struct Shared {
    next_id: AtomicU64,
    outbox_tx: UnboundedSender<RelayRequest>,
    outbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RelayRequest>>,
    pending: DashMap<u64, oneshot::Sender<ProviderResult<Value>>>,
    listeners: ListenerRegistry,
    /// Names for chains the built-in table does not know.
    chain_names: HashMap<u64, String>,
    last_poll: Mutex<Option<Instant>>,
    request_timeout: Duration,
    poll_timeout: Duration,
    confirmation_timeout: Duration,
}

/// Wallet provider whose requests are executed by a page script against
/// `window.ethereum`. Clones share one relay.
#[derive(Clone)]
pub struct BrowserRelayProvider {
    shared: Arc<Shared>,
}

impl BrowserRelayProvider {
    pub fn new(config: &ProviderConfig, networks: &[NetworkConfig]) -> Self {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let chain_names = networks
            .iter()
            .map(|n| (n.chain_id, n.chain_name.clone()))
            .collect();

        tracing::info!(
            request_timeout_secs = config.relay_request_timeout_secs,
            poll_secs = config.relay_poll_secs,
            "Browser relay provider initialized"
        );

        Self {
            shared: Arc::new(Shared {
                next_id: AtomicU64::new(1),
                outbox_tx,
                outbox_rx: tokio::sync::Mutex::new(outbox_rx),
                pending: DashMap::new(),
                listeners: ListenerRegistry::new(),
                chain_names,
                last_poll: Mutex::new(None),
                request_timeout: Duration::from_secs(config.relay_request_timeout_secs),
                poll_timeout: Duration::from_secs(config.relay_poll_secs),
                confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            }),
        }
    }

    /// Whether a page has polled recently enough to pick up a request.
    pub fn is_attached(&self) -> bool {
        let window = self.shared.poll_timeout * 2;
        self.shared
            .last_poll
            .lock()
            .is_some_and(|at| at.elapsed() < window)
    }

    /// Requests handed out but not yet answered.
    pub fn pending(&self) -> usize {
        self.shared.pending.len()
    }

    /// Long-poll for the next request to run in the page.
    ///
    /// Returns `None` when nothing arrived within the poll window. Requests
    /// whose caller already gave up are skipped.
    pub async fn next_request(&self) -> Option<RelayRequest> {
        self.touch();
        let deadline = tokio::time::Instant::now() + self.shared.poll_timeout;
        let next = {
            let mut outbox = self.shared.outbox_rx.lock().await;
            loop {
                match tokio::time::timeout_at(deadline, outbox.recv()).await {
                    Ok(Some(request)) if self.shared.pending.contains_key(&request.id) => {
                        break Some(request);
                    }
                    Ok(Some(stale)) => {
                        tracing::debug!(id = stale.id, method = %stale.method, "Dropping abandoned wallet request");
                    }
                    Ok(None) | Err(_) => break None,
                }
            }
        };
        self.touch();
        next
    }

    /// Resolve a request with the page's answer. Returns false for unknown
    /// or already-expired ids.
    pub fn complete(&self, response: RelayResponse) -> bool {
        let Some((_, waiter)) = self.shared.pending.remove(&response.id) else {
            tracing::warn!(id = response.id, "Result for unknown wallet request");
            return false;
        };
        let outcome = match response.error {
            Some(error) => Err(ProviderError::rejected(error.code, error.message)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        waiter.send(outcome).is_ok()
    }

    /// Fan a page event out to the registered listeners.
    pub fn notify(&self, notification: RelayNotification) -> usize {
        self.shared.listeners.emit(notification.into())
    }

    /// Run one EIP-1193 request in the page and wait for its result.
    pub async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        if !self.is_attached() {
            return Err(ProviderError::Disconnected(
                "no page with an injected wallet is polling the relay".to_string(),
            ));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(id, tx);
        tracing::debug!(id, method, "Relaying wallet request");

        let request = RelayRequest {
            id,
            method: method.to_string(),
            params,
        };
        if self.shared.outbox_tx.send(request).is_err() {
            self.shared.pending.remove(&id);
            return Err(ProviderError::Disconnected("relay closed".to_string()));
        }

        match tokio::time::timeout(self.shared.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProviderError::Disconnected(format!("{method} abandoned"))),
            Err(_) => {
                self.shared.pending.remove(&id);
                Err(ProviderError::Timeout(self.shared.request_timeout.as_secs()))
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Rpc(format!("{method} returned an unexpected result: {e}")))
    }

    /// Poll for the receipt until it exists or the confirmation timeout passes.
    async fn wait_for_receipt(&self, hash: TxHash) -> ProviderResult<Confirmation> {
        let deadline = Instant::now() + self.shared.confirmation_timeout;
        loop {
            match self
                .call::<Option<ReceiptFields>>("eth_getTransactionReceipt", json!([hash]))
                .await
            {
                Ok(Some(receipt)) => {
                    return Ok(Confirmation {
                        block_number: receipt.block_number.map(|n| n.to::<u64>()),
                        success: receipt.status.map_or(true, |s| s.to::<u64>() == 1),
                    });
                }
                Ok(None) => {}
                // A reloading page drops polls; keep waiting.
                Err(ProviderError::Timeout(_)) | Err(ProviderError::Disconnected(_)) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(ProviderError::Timeout(self.shared.confirmation_timeout.as_secs()));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    fn touch(&self) {
        *self.shared.last_poll.lock() = Some(Instant::now());
    }
}

#[async_trait]
impl WalletProvider for BrowserRelayProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.call("eth_requestAccounts", json!([])).await
    }

    async fn chain_id(&self) -> ProviderResult<u64> {
        let id: U64 = self.call("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    async fn network(&self) -> ProviderResult<NetworkInfo> {
        let mut info = NetworkInfo::from_chain_id(self.chain_id().await?);
        if info.name == "unknown" {
            if let Some(name) = self.shared.chain_names.get(&info.chain_id) {
                info.name = name.clone();
            }
        }
        Ok(info)
    }

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": U64::from(chain_id) }]),
        )
        .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> ProviderResult<()> {
        self.request(
            "wallet_addEthereumChain",
            json!([{
                "chainId": U64::from(params.chain_id),
                "chainName": params.chain_name,
                "rpcUrls": params.rpc_urls,
                "nativeCurrency": params.native_currency,
                "blockExplorerUrls": params.block_explorer_urls,
            }]),
        )
        .await?;
        Ok(())
    }

    /// Uses `eth_accounts`, which never prompts.
    async fn signer(&self) -> ProviderResult<Arc<dyn TransactionSigner>> {
        let accounts: Vec<Address> = self.call("eth_accounts", json!([])).await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| ProviderError::Signer("wallet exposes no account".to_string()))?;
        Ok(Arc::new(RelaySigner {
            address,
            relay: self.clone(),
        }))
    }

    fn add_listener(&self, kind: EventKind, sender: UnboundedSender<ProviderEvent>) -> ListenerId {
        self.shared.listeners.add(kind, sender)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }
}

impl std::fmt::Debug for BrowserRelayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserRelayProvider")
            .field("attached", &self.is_attached())
            .field("pending", &self.pending())
            .field("listeners", &self.shared.listeners.len())
            .finish()
    }
}

/// Signs through the extension; every send prompts the user there.
struct RelaySigner {
    address: Address,
    relay: BrowserRelayProvider,
}

#[async_trait]
impl TransactionSigner for RelaySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, request: TransferRequest) -> ProviderResult<SubmittedTransaction> {
        let params = json!([{
            "from": self.address,
            "to": request.to,
            "value": request.value,
            "gas": U64::from(request.gas_limit),
        }]);
        let hash: TxHash = self.relay.call("eth_sendTransaction", params).await?;
        tracing::info!(tx_hash = %hash, to = %request.to, value = %request.value, "Transaction accepted by wallet");

        let relay = self.relay.clone();
        Ok(SubmittedTransaction {
            hash,
            confirmation: Box::pin(async move { relay.wait_for_receipt(hash).await }),
        })
    }
}
