//! Wallet bridge: connect, track network, send the test transfer.

use std::sync::{Arc, Weak};

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, TxHash};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::bridge::state::{ConnectionState, Notice, TransactionRecord};
use crate::bridge::subscription::Subscription;
use crate::bridge::view::PageView;
use crate::config::{ConfigError, DemoConfig, ValidationError};
use crate::provider::{
    AddChainParams, EventKind, ProviderEvent, TransferRequest, WalletProvider,
};

/// Fixed inputs of the bridge, resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    pub transfer: TransferRequest,
    pub target_network: AddChainParams,
    pub switch_on_connect: bool,
}

impl BridgeSettings {
    pub fn from_config(config: &DemoConfig) -> Result<Self, ConfigError> {
        let tx = &config.transaction;
        let to: Address = tx.recipient.parse().map_err(|_| {
            ConfigError::Validation(vec![ValidationError {
                field: "transaction.recipient".to_string(),
                message: format!("'{}' is not a 20-byte address", tx.recipient),
            }])
        })?;
        let value = parse_ether(&tx.value_ether).map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "transaction.value_ether".to_string(),
                message: e.to_string(),
            }])
        })?;

        Ok(Self {
            transfer: TransferRequest {
                to,
                value,
                gas_limit: tx.gas_limit,
            },
            target_network: AddChainParams::from(&config.target_network),
            switch_on_connect: config.bridge.switch_on_connect,
        })
    }
}

/// Page-side wallet state machine.
///
/// Every operation swallows provider failures: they are logged (and, for
/// missing provider or missing account, surfaced as a [`Notice`]) but never
/// returned to the caller.
pub struct WalletBridge {
    provider: Option<Arc<dyn WalletProvider>>,
    settings: BridgeSettings,
    connection: RwLock<ConnectionState>,
    transaction: RwLock<Option<TransactionRecord>>,
    notices: Mutex<Vec<Notice>>,
    /// Serializes provider requests issued by the bridge.
    op_lock: tokio::sync::Mutex<()>,
    subscription: Mutex<Option<Subscription>>,
}

impl WalletBridge {
    /// `provider` is `None` when no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, settings: BridgeSettings) -> Self {
        Self {
            provider,
            settings,
            connection: RwLock::new(ConnectionState::default()),
            transaction: RwLock::new(None),
            notices: Mutex::new(Vec::new()),
            op_lock: tokio::sync::Mutex::new(()),
            subscription: Mutex::new(None),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Request account access and adopt the first account.
    ///
    /// Returns the connected account, if any.
    pub async fn connect(&self) -> Option<Address> {
        let Some(provider) = self.provider_or_notice() else {
            metrics::counter!("wallet_connect_total", "outcome" => "no_provider").increment(1);
            return None;
        };
        let _op = self.op_lock.lock().await;

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(error = %e, "Account request failed");
                metrics::counter!("wallet_connect_total", "outcome" => "rejected").increment(1);
                return None;
            }
        };

        let account = accounts.first().copied();
        self.connection.write().account = account;
        match account {
            Some(account) => {
                tracing::info!(account = %account, "Wallet connected");
                metrics::counter!("wallet_connect_total", "outcome" => "connected").increment(1);
            }
            None => tracing::warn!("Provider returned no accounts"),
        }

        self.refresh_network_locked(provider.as_ref()).await;

        if self.settings.switch_on_connect {
            self.switch_network_locked(provider.as_ref()).await;
        }

        account
    }

    /// Re-read the active chain from the provider. No-op without a provider.
    pub async fn refresh_network(&self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };
        let _op = self.op_lock.lock().await;
        self.refresh_network_locked(provider.as_ref()).await;
    }

    async fn refresh_network_locked(&self, provider: &dyn WalletProvider) {
        match provider.network().await {
            Ok(network) => {
                tracing::debug!(chain_id = network.chain_id, name = %network.name, "Network refreshed");
                self.connection.write().network = Some(network);
            }
            Err(e) => tracing::warn!(error = %e, "Network refresh failed"),
        }
    }

    /// Submit the fixed transfer and record its hash.
    ///
    /// The hash is recorded as soon as the provider accepts the transaction;
    /// the confirmation is awaited on a background task and only logged.
    pub async fn send_test_transaction(&self) -> Option<TxHash> {
        if !self.connection.read().is_connected() {
            self.push_notice(Notice::ConnectFirst);
            metrics::counter!("wallet_tx_submitted_total", "outcome" => "not_connected").increment(1);
            return None;
        }
        let provider = self.provider_or_notice()?;
        let _op = self.op_lock.lock().await;

        let transfer = self.settings.transfer;
        let signer = match provider.signer().await {
            Ok(signer) => signer,
            Err(e) => {
                tracing::error!(error = %e, "Could not obtain a signer");
                metrics::counter!("wallet_tx_submitted_total", "outcome" => "failed").increment(1);
                return None;
            }
        };

        let submitted = match signer.send_transaction(transfer).await {
            Ok(submitted) => submitted,
            Err(e) => {
                tracing::error!(error = %e, to = %transfer.to, "Transaction failed");
                metrics::counter!("wallet_tx_submitted_total", "outcome" => "failed").increment(1);
                return None;
            }
        };

        let hash = submitted.hash;
        *self.transaction.write() = Some(TransactionRecord {
            from: signer.address(),
            recipient: transfer.to,
            value: transfer.value,
            gas_limit: transfer.gas_limit,
            hash,
        });
        tracing::info!(tx_hash = %hash, "Transaction sent");
        metrics::counter!("wallet_tx_submitted_total", "outcome" => "sent").increment(1);

        let confirmation = submitted.confirmation;
        tokio::spawn(async move {
            match confirmation.await {
                Ok(c) if c.success => {
                    tracing::info!(tx_hash = %hash, block = ?c.block_number, "Transaction confirmed")
                }
                Ok(c) => tracing::warn!(tx_hash = %hash, block = ?c.block_number, "Transaction reverted"),
                Err(e) => tracing::warn!(tx_hash = %hash, error = %e, "Confirmation wait failed"),
            }
        });

        Some(hash)
    }

    /// Switch the wallet to the target network, adding it first if the
    /// wallet does not know it. Returns whether the wallet accepted.
    pub async fn switch_network(&self) -> bool {
        let Some(provider) = self.provider_or_notice() else {
            return false;
        };
        let _op = self.op_lock.lock().await;
        self.switch_network_locked(provider.as_ref()).await
    }

    /// On success the network is re-read before returning, so the view
    /// reflects the new chain without waiting for `chainChanged`.
    async fn switch_network_locked(&self, provider: &dyn WalletProvider) -> bool {
        let target = &self.settings.target_network;
        let switched = match provider.switch_chain(target.chain_id).await {
            Ok(()) => {
                tracing::info!(chain_id = target.chain_id, "Switched to target network");
                true
            }
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(chain_id = target.chain_id, "Target network unknown to wallet, adding it");
                match provider.add_chain(target).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(error = %e, chain_id = target.chain_id, "Adding network failed");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, chain_id = target.chain_id, "Network switch rejected");
                false
            }
        };

        if switched {
            self.refresh_network_locked(provider).await;
        }
        switched
    }

    /// Listen for chain and account changes for the rest of the session.
    ///
    /// Installs the listeners once; later calls return false.
    pub fn subscribe(self: &Arc<Self>) -> bool {
        let Some(provider) = self.provider.clone() else {
            return false;
        };
        let mut slot = self.subscription.lock();
        if slot.is_some() {
            return false;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let ids = vec![
            provider.add_listener(EventKind::ChainChanged, tx.clone()),
            provider.add_listener(EventKind::AccountsChanged, tx),
        ];

        let bridge: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };
                bridge.handle_event(event).await;
            }
        });

        *slot = Some(Subscription::new(provider, ids, task));
        tracing::debug!("Subscribed to provider events");
        true
    }

    /// Remove the event listeners. Returns false if none were installed.
    pub fn teardown(&self) -> bool {
        match self.subscription.lock().take() {
            Some(subscription) => {
                subscription.dispose();
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Apply one provider notification.
    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::ChainChanged(chain_id) => {
                tracing::info!(chain_id, "Chain changed");
                self.refresh_network().await;
            }
            ProviderEvent::AccountsChanged(accounts) => self.apply_accounts(&accounts),
        }
    }

    fn apply_accounts(&self, accounts: &[Address]) {
        let account = accounts.first().copied();
        match account {
            Some(a) => tracing::info!(account = %a, "Active account changed"),
            None => tracing::info!("Wallet reported no accounts, clearing connection"),
        }
        self.connection.write().account = account;
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection.read().clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.connection.read().account
    }

    pub fn transaction(&self) -> Option<TransactionRecord> {
        self.transaction.read().clone()
    }

    /// Notices not yet shown, without consuming them.
    pub fn pending_notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Render the page model, consuming pending notices.
    pub fn view(&self) -> PageView {
        let notices = std::mem::take(&mut *self.notices.lock());
        let connection = self.connection.read().clone();
        let transaction = self.transaction.read().clone();
        PageView::render(&connection, transaction.as_ref(), &notices)
    }

    fn provider_or_notice(&self) -> Option<Arc<dyn WalletProvider>> {
        let provider = self.provider.clone();
        if provider.is_none() {
            tracing::warn!("No wallet provider present");
            self.push_notice(Notice::ProviderNotDetected);
        }
        provider
    }

    fn push_notice(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

impl std::fmt::Debug for WalletBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletBridge")
            .field("has_provider", &self.has_provider())
            .field("connection", &*self.connection.read())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = BridgeSettings::from_config(&DemoConfig::default()).unwrap();
        assert_eq!(settings.transfer.gas_limit, 21_000);
        assert_eq!(settings.transfer.value, parse_ether("0.001").unwrap());
        assert_eq!(settings.target_network.chain_id, 11_155_111);
        assert!(!settings.switch_on_connect);
    }

    #[test]
    fn test_settings_reject_bad_recipient() {
        let mut config = DemoConfig::default();
        config.transaction.recipient = "0xcf9D4AF9".to_string();
        let err = BridgeSettings::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("transaction.recipient"));
    }

    #[tokio::test]
    async fn test_no_provider_yields_one_notice_per_action() {
        let bridge = WalletBridge::new(None, BridgeSettings::from_config(&DemoConfig::default()).unwrap());

        assert_eq!(bridge.connect().await, None);
        assert_eq!(bridge.pending_notices(), vec![Notice::ProviderNotDetected]);
        assert_eq!(bridge.connection(), ConnectionState::default());

        bridge.refresh_network().await;
        assert_eq!(bridge.pending_notices().len(), 1);

        let view = bridge.view();
        assert_eq!(view.notices, vec!["Wallet provider not detected!".to_string()]);
        assert!(bridge.pending_notices().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_connect_asks_to_connect() {
        let bridge = WalletBridge::new(None, BridgeSettings::from_config(&DemoConfig::default()).unwrap());
        assert_eq!(bridge.send_test_transaction().await, None);
        assert_eq!(bridge.pending_notices(), vec![Notice::ConnectFirst]);
        assert!(bridge.transaction().is_none());
    }
}
