//! Provider-facing types and error definitions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NetworkConfig;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;

/// EIP-3326: the requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Errors surfaced by a wallet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The wallet refused the request with an EIP-1193 error code.
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// JSON-RPC transport or node error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Signer setup or signing failed.
    #[error("Signer error: {0}")]
    Signer(String),

    /// The provider has no usable connection.
    #[error("Provider disconnected: {0}")]
    Disconnected(String),
}

impl ProviderError {
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// The EIP-1193 code, if this is a wallet rejection.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN)
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Current chain as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: String,
}

impl NetworkInfo {
    /// Build from a chain id using the well-known chain names.
    pub fn from_chain_id(chain_id: u64) -> Self {
        Self {
            chain_id,
            name: chain_name(chain_id).to_string(),
        }
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Chain ID: {})", self.name, self.chain_id)
    }
}

/// Short names for the chains this demo is likely to meet.
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        11_155_111 => "sepolia",
        17_000 => "holesky",
        31_337 => "anvil",
        _ => "unknown",
    }
}

/// `wallet_addEthereumChain` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl From<&NetworkConfig> for AddChainParams {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            chain_id: network.chain_id,
            chain_name: network.chain_name.clone(),
            rpc_urls: network.rpc_urls.clone(),
            native_currency: NativeCurrency {
                name: network.currency_name.clone(),
                symbol: network.currency_symbol.clone(),
                decimals: network.currency_decimals,
            },
            block_explorer_urls: network.block_explorer_urls.clone(),
        }
    }
}

/// A plain value transfer handed to a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
}

/// Final outcome of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Future resolving once the transaction is mined with enough confirmations.
pub type ConfirmationFuture = Pin<Box<dyn Future<Output = ProviderResult<Confirmation>> + Send>>;

/// Handle returned as soon as a transaction has been broadcast.
pub struct SubmittedTransaction {
    pub hash: TxHash,
    pub confirmation: ConfirmationFuture,
}

impl fmt::Debug for SubmittedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedTransaction")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// Provider notifications a page can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChainChanged,
    AccountsChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChainChanged => "chainChanged",
            Self::AccountsChanged => "accountsChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    ChainChanged(u64),
    AccountsChanged(Vec<Address>),
}

impl ProviderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChainChanged(_) => EventKind::ChainChanged,
            Self::AccountsChanged(_) => EventKind::AccountsChanged,
        }
    }
}

/// Identifies a registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_display() {
        let network = NetworkInfo::from_chain_id(11_155_111);
        assert_eq!(network.to_string(), "sepolia (Chain ID: 11155111)");
        assert_eq!(NetworkInfo::from_chain_id(5).name, "unknown");
    }

    #[test]
    fn test_error_codes() {
        let err = ProviderError::rejected(UNRECOGNIZED_CHAIN, "Unrecognized chain ID");
        assert!(err.is_unrecognized_chain());
        assert_eq!(err.to_string(), "Request rejected (4902): Unrecognized chain ID");

        let err = ProviderError::Timeout(10);
        assert_eq!(err.code(), None);
        assert!(!err.is_unrecognized_chain());
    }

    #[test]
    fn test_add_chain_params_serialize_camel_case() {
        let params = AddChainParams::from(&NetworkConfig::default());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainName"], "Sepolia Test Network");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["blockExplorerUrls"][0], "https://sepolia.etherscan.io");
    }
}
