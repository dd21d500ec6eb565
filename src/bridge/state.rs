//! Session state owned by the bridge.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::provider::NetworkInfo;

/// Active account and chain. Both absent until a connect succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub account: Option<Address>,
    pub network: Option<NetworkInfo>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

/// A submitted test transfer. Written once when the provider hands back the
/// hash; never updated with the confirmation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub from: Address,
    pub recipient: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub hash: TxHash,
}

/// User-visible messages, drained by the page on render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ProviderNotDetected,
    ConnectFirst,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderNotDetected => f.write_str("Wallet provider not detected!"),
            Self::ConnectFirst => f.write_str("Connect wallet first!"),
        }
    }
}
