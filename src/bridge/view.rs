//! Rendering model for the demo page.

use serde::{Deserialize, Serialize};

use crate::bridge::state::{ConnectionState, Notice, TransactionRecord};

/// Everything the page shows, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    /// Connect button label: `Connect Wallet` or `Connected: 0xAbCd...`.
    pub connect_label: String,
    /// `Current Network: sepolia (Chain ID: 11155111)` or `... Not connected`.
    pub network_line: String,
    /// `Transaction sent! Hash: 0x...` once a send succeeded.
    pub transaction_line: Option<String>,
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    pub tx_hash: Option<String>,
    pub notices: Vec<String>,
}

impl PageView {
    pub fn render(
        connection: &ConnectionState,
        transaction: Option<&TransactionRecord>,
        notices: &[Notice],
    ) -> Self {
        let account = connection.account.map(|a| a.to_string());
        let connect_label = match &account {
            // Address strings are ASCII, so byte slicing is safe.
            Some(a) => format!("Connected: {}...", &a[..6]),
            None => "Connect Wallet".to_string(),
        };
        let network_line = match &connection.network {
            Some(network) => format!("Current Network: {network}"),
            None => "Current Network: Not connected".to_string(),
        };
        let tx_hash = transaction.map(|t| t.hash.to_string());

        Self {
            connect_label,
            network_line,
            transaction_line: tx_hash.as_ref().map(|h| format!("Transaction sent! Hash: {h}")),
            account,
            chain_id: connection.network.as_ref().map(|n| n.chain_id),
            tx_hash,
            notices: notices.iter().map(ToString::to_string).collect(),
        }
    }
}
