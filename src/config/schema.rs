//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the demo page
//! and the automation driver. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by both binaries.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Demo page server settings.
    pub server: ServerConfig,

    /// Wallet provider settings (RPC endpoint, signer source).
    pub provider: ProviderConfig,

    /// Networks the provider knows about at startup.
    pub networks: Vec<NetworkConfig>,

    /// Network the "switch network" action targets.
    pub target_network: NetworkConfig,

    /// The fixed test transfer.
    pub transaction: TransactionConfig,

    /// Bridge behavior toggles.
    pub bridge: BridgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Browser automation settings.
    pub automation: AutomationConfig,
}

/// Demo page server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5173").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5173".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Where the page's wallet lives.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// The wallet extension injected into the visitor's browser, reached
    /// through a relay script on the page.
    #[default]
    Browser,
    /// A local key signing against a JSON-RPC node.
    Rpc,
}

/// Wallet provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// When false the page runs with no provider, like a browser without a
    /// wallet extension.
    pub enabled: bool,

    /// Browser extension (relayed) or local RPC signer.
    pub mode: ProviderMode,

    /// JSON-RPC endpoint of the initially active chain.
    pub rpc_url: String,

    /// Chain ID of the initially active chain.
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations awaited after submission.
    pub confirmation_blocks: u64,

    /// Upper bound on the confirmation wait in seconds.
    pub confirmation_timeout_secs: u64,

    /// How long a relayed wallet request may wait for the page (and the
    /// user's approval) in seconds.
    pub relay_request_timeout_secs: u64,

    /// How long the page's long-poll for the next request is held open.
    pub relay_poll_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ProviderMode::Browser,
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 120,
            relay_request_timeout_secs: 45,
            relay_poll_secs: 20,
        }
    }
}

/// A network the provider can switch to, in `wallet_addEthereumChain` shape.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub block_explorer_urls: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111,
            chain_name: "Sepolia Test Network".to_string(),
            rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
            currency_name: "ETH".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            block_explorer_urls: vec!["https://sepolia.etherscan.io".to_string()],
        }
    }
}

/// The fixed test transfer submitted by the send button.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Recipient address. Placeholder; replace with a test recipient.
    pub recipient: String,

    /// Amount in ether, as a decimal string.
    pub value_ether: String,

    /// Gas ceiling for the transfer.
    pub gas_limit: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            recipient: "0xcf9D4AF9f5A054ddf211CA2fEa615d2e43a45AAC".to_string(),
            value_ether: "0.001".to_string(),
            gas_limit: 21_000,
        }
    }
}

/// Wallet bridge behavior.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Switch to `target_network` right after a successful connect.
    pub switch_on_connect: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "wallet_demo=debug,tower_http=debug".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Browser automation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Extension ID; must match the unpacked extension build.
    pub extension_id: String,

    /// Path to the unpacked extension build.
    pub extension_path: String,

    /// Browser profile directory, wiped before each run.
    pub profile_dir: String,

    /// URL of the demo page.
    pub dapp_url: String,

    /// Explicit Chrome binary; auto-detected when absent.
    pub chrome_path: Option<String>,

    /// Remote debugging port.
    pub debug_port: u16,

    /// Wallet extensions refuse to run headless, so this stays off in practice.
    pub headless: bool,

    /// Where the failure screenshot is written.
    pub screenshot_path: String,

    /// Label of the network selected during network configuration.
    pub network_label: String,

    /// Fixed wait points.
    pub timeouts: AutomationTimeouts,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            extension_id: "lejgdnclalikkmkjkdabeihphmonnhng".to_string(),
            extension_path: "../metamask-extension".to_string(),
            profile_dir: "../mm-profile".to_string(),
            dapp_url: "http://localhost:5173".to_string(),
            chrome_path: None,
            debug_port: 9333,
            headless: false,
            screenshot_path: "error-screenshot.png".to_string(),
            network_label: "Sepolia".to_string(),
            timeouts: AutomationTimeouts::default(),
        }
    }
}

/// Timeouts (milliseconds) for each wait point of the automation run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutomationTimeouts {
    /// Whole-run deadline.
    pub test_ms: u64,
    pub page_load_ms: u64,
    pub popup_ms: u64,
    pub action_ms: u64,
    /// Wait for the approval popup after clicking send.
    pub tx_popup_ms: u64,
    /// Pause after navigating to the demo page.
    pub settle_ms: u64,
    /// Pause before clicking confirm in the approval popup.
    pub confirm_delay_ms: u64,
    /// Wait for the page to reflect the submitted transaction.
    pub post_tx_ms: u64,
}

impl Default for AutomationTimeouts {
    fn default() -> Self {
        Self {
            test_ms: 120_000,
            page_load_ms: 30_000,
            popup_ms: 10_000,
            action_ms: 5_000,
            tx_popup_ms: 15_000,
            settle_ms: 1_000,
            confirm_delay_ms: 2_000,
            post_tx_ms: 10_000,
        }
    }
}
