//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve bridge settings from validated configuration
//! - Build the wallet provider: the browser relay, the RPC signer, or none
//! - Assemble the bridge and install its event subscription
//!
//! # Design Decisions
//! - Fail fast: a provider that is enabled but cannot load its key is fatal
//! - A disabled provider is not an error; the page runs without a wallet

use std::sync::Arc;

use thiserror::Error;

use crate::bridge::{BridgeSettings, WalletBridge};
use crate::config::{ConfigError, DemoConfig, ProviderMode};
use crate::provider::{
    BrowserRelayProvider, ProviderError, RpcWalletProvider, Wallet, WalletProvider,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),
}

/// The provider the bridge uses, plus the relay handle the page routes need
/// when that provider lives in the browser.
#[derive(Default)]
pub struct BuiltProvider {
    pub provider: Option<Arc<dyn WalletProvider>>,
    pub relay: Option<BrowserRelayProvider>,
}

/// Build the configured provider. Both fields are `None` when the provider
/// is disabled.
pub fn build_provider(config: &DemoConfig) -> Result<BuiltProvider, StartupError> {
    if !config.provider.enabled {
        tracing::warn!("Wallet provider disabled; the page will report no provider");
        return Ok(BuiltProvider::default());
    }

    match config.provider.mode {
        ProviderMode::Browser => {
            let mut networks = config.networks.clone();
            networks.push(config.target_network.clone());
            let relay = BrowserRelayProvider::new(&config.provider, &networks);
            Ok(BuiltProvider {
                provider: Some(Arc::new(relay.clone())),
                relay: Some(relay),
            })
        }
        ProviderMode::Rpc => {
            let wallet = Wallet::from_env()?;
            let provider = RpcWalletProvider::new(&config.provider, &config.networks, wallet)?;
            Ok(BuiltProvider {
                provider: Some(Arc::new(provider)),
                relay: None,
            })
        }
    }
}

/// Assemble a bridge around `provider` and subscribe it to provider events.
///
/// Must be called inside a Tokio runtime (the subscription spawns a task).
pub fn build_bridge(
    config: &DemoConfig,
    provider: Option<Arc<dyn WalletProvider>>,
) -> Result<Arc<WalletBridge>, StartupError> {
    let settings = BridgeSettings::from_config(config)?;
    let bridge = Arc::new(WalletBridge::new(provider, settings));
    bridge.subscribe();

    tracing::info!(
        has_provider = bridge.has_provider(),
        recipient = %bridge.settings().transfer.to,
        target_chain = bridge.settings().target_network.chain_id,
        "Wallet bridge ready"
    );
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_is_none() {
        let mut config = DemoConfig::default();
        config.provider.enabled = false;
        let built = build_provider(&config).unwrap();
        assert!(built.provider.is_none());
        assert!(built.relay.is_none());
    }

    #[test]
    fn test_browser_mode_shares_the_relay() {
        let built = build_provider(&DemoConfig::default()).unwrap();
        assert!(built.provider.is_some());
        let relay = built.relay.unwrap();
        assert!(!relay.is_attached());
    }

    #[tokio::test]
    async fn test_bridge_without_provider_is_not_subscribed() {
        let bridge = build_bridge(&DemoConfig::default(), None).unwrap();
        assert!(!bridge.has_provider());
        assert!(!bridge.is_subscribed());
    }
}
