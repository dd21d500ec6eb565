//! Wallet provider subsystem.
//!
//! # Data Flow
//! ```text
//! Bridge action
//!     → WalletProvider (accounts, chain, signer, listeners)
//!     → TransactionSigner (sign + broadcast)
//!     → SubmittedTransaction (hash now, confirmation later)
//! ```
//!
//! A page never reaches for a global provider object. The provider is an
//! injected capability: `Option<Arc<dyn WalletProvider>>`, where `None` means
//! no wallet is installed. `relay.rs` forwards requests to the wallet
//! extension in the visitor's browser; `rpc.rs` stands in for it with a node
//! and a local key; tests substitute fakes.
//!
//! # Security Constraints
//! - Seed phrases and private keys ONLY from environment variables
//! - Never log key material

pub mod events;
pub mod relay;
pub mod rpc;
pub mod types;
pub mod wallet;

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

pub use events::ListenerRegistry;
pub use relay::{BrowserRelayProvider, RelayNotification, RelayRequest, RelayResponse};
pub use rpc::RpcWalletProvider;
pub use types::{
    chain_name, AddChainParams, Confirmation, ConfirmationFuture, EventKind, ListenerId,
    NativeCurrency, NetworkInfo, ProviderError, ProviderEvent, ProviderResult,
    SubmittedTransaction, TransferRequest, UNRECOGNIZED_CHAIN, USER_REJECTED,
};
pub use wallet::Wallet;

/// The surface a wallet exposes to a page.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Chain id of the active network.
    async fn chain_id(&self) -> ProviderResult<u64>;

    /// Chain id plus a human-readable name.
    async fn network(&self) -> ProviderResult<NetworkInfo> {
        Ok(NetworkInfo::from_chain_id(self.chain_id().await?))
    }

    /// `wallet_switchEthereumChain`. Unknown chains fail with code 4902.
    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()>;

    /// `wallet_addEthereumChain`.
    async fn add_chain(&self, params: &AddChainParams) -> ProviderResult<()>;

    /// A signer for the currently selected account.
    async fn signer(&self) -> ProviderResult<Arc<dyn TransactionSigner>>;

    /// Register a listener; events of `kind` are pushed into `sender`.
    fn add_listener(&self, kind: EventKind, sender: UnboundedSender<ProviderEvent>) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Provider-derived handle allowed to submit transactions for one account.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign and broadcast. Returns once the node has accepted the transaction.
    async fn send_transaction(&self, request: TransferRequest) -> ProviderResult<SubmittedTransaction>;
}
