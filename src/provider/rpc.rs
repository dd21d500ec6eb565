//! Provider backed by a JSON-RPC node and a local key.
//!
//! # Responsibilities
//! - Stand in for a browser wallet when the page runs server-side
//! - Track known chains and the active one; emit `chainChanged` on switch
//! - Sign and broadcast transfers, exposing the confirmation as a future
//! - Bound every RPC call with the configured timeout

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

use crate::config::{NetworkConfig, ProviderConfig};
use crate::provider::events::ListenerRegistry;
use crate::provider::types::{
    chain_name, AddChainParams, Confirmation, EventKind, ListenerId, NetworkInfo, ProviderError,
    ProviderEvent, ProviderResult, SubmittedTransaction, TransferRequest, UNRECOGNIZED_CHAIN,
};
use crate::provider::wallet::Wallet;
use crate::provider::{TransactionSigner, WalletProvider};

/// The chain requests currently go to.
#[derive(Clone)]
struct ActiveChain {
    chain_id: u64,
    client: DynProvider,
}

/// Wallet provider that signs locally and talks to a node over HTTP.
pub struct RpcWalletProvider {
    wallet: Wallet,
    chains: RwLock<HashMap<u64, AddChainParams>>,
    active: RwLock<ActiveChain>,
    listeners: ListenerRegistry,
    rpc_timeout: Duration,
    confirmation_blocks: u64,
    confirmation_timeout: Duration,
}

impl RpcWalletProvider {
    /// Create a provider whose active chain is `config.rpc_url`.
    ///
    /// No request is made here; the node is first contacted on use.
    pub fn new(
        config: &ProviderConfig,
        networks: &[NetworkConfig],
        wallet: Wallet,
    ) -> ProviderResult<Self> {
        let client = connect(&config.rpc_url, &wallet)?;

        let mut chains: HashMap<u64, AddChainParams> = networks
            .iter()
            .map(|n| (n.chain_id, AddChainParams::from(n)))
            .collect();
        chains.entry(config.chain_id).or_insert_with(|| AddChainParams {
            chain_id: config.chain_id,
            chain_name: chain_name(config.chain_id).to_string(),
            rpc_urls: vec![config.rpc_url.clone()],
            native_currency: crate::provider::types::NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            block_explorer_urls: Vec::new(),
        });

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            known_chains = chains.len(),
            address = %wallet.address(),
            "RPC wallet provider initialized"
        );

        Ok(Self {
            wallet,
            chains: RwLock::new(chains),
            active: RwLock::new(ActiveChain {
                chain_id: config.chain_id,
                client,
            }),
            listeners: ListenerRegistry::new(),
            rpc_timeout: Duration::from_secs(config.rpc_timeout_secs),
            confirmation_blocks: config.confirmation_blocks,
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        })
    }

    /// Chain id the provider believes is active, without asking the node.
    pub fn active_chain_id(&self) -> u64 {
        self.active.read().chain_id
    }

    pub fn knows_chain(&self, chain_id: u64) -> bool {
        self.chains.read().contains_key(&chain_id)
    }

    /// Announce an account change to listeners.
    pub fn emit_accounts_changed(&self, accounts: Vec<Address>) -> usize {
        self.listeners.emit(ProviderEvent::AccountsChanged(accounts))
    }

    fn client(&self) -> DynProvider {
        self.active.read().client.clone()
    }

    async fn bounded<T, E, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        bounded(self.rpc_timeout, fut).await
    }
}

fn connect(rpc_url: &str, wallet: &Wallet) -> ProviderResult<DynProvider> {
    let url: url::Url = rpc_url
        .parse()
        .map_err(|e| ProviderError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
    Ok(ProviderBuilder::new()
        .wallet(wallet.ethereum_wallet())
        .connect_http(url)
        .erased())
}

async fn bounded<T, E, F>(limit: Duration, fut: F) -> ProviderResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ProviderError::Rpc(e.to_string())),
        Err(_) => Err(ProviderError::Timeout(limit.as_secs())),
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        Ok(vec![self.wallet.address()])
    }

    async fn chain_id(&self) -> ProviderResult<u64> {
        let client = self.client();
        self.bounded(client.get_chain_id()).await
    }

    async fn network(&self) -> ProviderResult<NetworkInfo> {
        let chain_id = self.chain_id().await?;
        let mut info = NetworkInfo::from_chain_id(chain_id);
        if info.name == "unknown" {
            if let Some(params) = self.chains.read().get(&chain_id) {
                info.name = params.chain_name.clone();
            }
        }
        Ok(info)
    }

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        if self.active_chain_id() == chain_id {
            return Ok(());
        }

        let rpc_url = {
            let chains = self.chains.read();
            let params = chains.get(&chain_id).ok_or_else(|| {
                ProviderError::rejected(
                    UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID {:#x}", chain_id),
                )
            })?;
            params
                .rpc_urls
                .first()
                .cloned()
                .ok_or_else(|| ProviderError::Rpc(format!("Chain {} has no RPC URL", chain_id)))?
        };

        let client = connect(&rpc_url, &self.wallet)?;
        *self.active.write() = ActiveChain { chain_id, client };

        tracing::info!(chain_id, rpc_url = %rpc_url, "Switched active chain");
        self.listeners.emit(ProviderEvent::ChainChanged(chain_id));
        Ok(())
    }

    /// Registers the chain and switches to it, as browser wallets do after
    /// the user approves the addition.
    async fn add_chain(&self, params: &AddChainParams) -> ProviderResult<()> {
        let first = params
            .rpc_urls
            .first()
            .ok_or_else(|| ProviderError::Rpc("wallet_addEthereumChain needs an RPC URL".into()))?;
        url::Url::parse(first)
            .map_err(|e| ProviderError::Rpc(format!("Invalid RPC URL '{}': {}", first, e)))?;

        self.chains.write().insert(params.chain_id, params.clone());
        tracing::info!(chain_id = params.chain_id, name = %params.chain_name, "Chain added");

        self.switch_chain(params.chain_id).await
    }

    async fn signer(&self) -> ProviderResult<Arc<dyn TransactionSigner>> {
        Ok(Arc::new(RpcSigner {
            address: self.wallet.address(),
            client: self.client(),
            rpc_timeout: self.rpc_timeout,
            confirmation_blocks: self.confirmation_blocks,
            confirmation_timeout: self.confirmation_timeout,
        }))
    }

    fn add_listener(&self, kind: EventKind, sender: UnboundedSender<ProviderEvent>) -> ListenerId {
        self.listeners.add(kind, sender)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl std::fmt::Debug for RpcWalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcWalletProvider")
            .field("address", &self.wallet.address())
            .field("active_chain_id", &self.active_chain_id())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Signer bound to the chain that was active when it was obtained.
struct RpcSigner {
    address: Address,
    client: DynProvider,
    rpc_timeout: Duration,
    confirmation_blocks: u64,
    confirmation_timeout: Duration,
}

#[async_trait]
impl TransactionSigner for RpcSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, request: TransferRequest) -> ProviderResult<SubmittedTransaction> {
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(request.to)
            .with_value(request.value)
            .with_gas_limit(request.gas_limit);

        let pending = bounded(self.rpc_timeout, self.client.send_transaction(tx)).await?;
        let hash = *pending.tx_hash();

        tracing::info!(tx_hash = %hash, to = %request.to, value = %request.value, "Transaction broadcast");

        let confirmation = pending
            .with_required_confirmations(self.confirmation_blocks)
            .with_timeout(Some(self.confirmation_timeout));

        Ok(SubmittedTransaction {
            hash,
            confirmation: Box::pin(async move {
                let receipt = confirmation
                    .get_receipt()
                    .await
                    .map_err(|e| ProviderError::Rpc(e.to_string()))?;
                Ok(Confirmation {
                    block_number: receipt.block_number(),
                    success: receipt.status(),
                })
            }),
        })
    }
}
