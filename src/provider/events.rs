//! Listener bookkeeping for provider notifications.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::provider::types::{EventKind, ListenerId, ProviderEvent};

/// Registered `on(...)` listeners, keyed by id.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, (EventKind, UnboundedSender<ProviderEvent>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EventKind, sender: UnboundedSender<ProviderEvent>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.insert(id, (kind, sender));
        tracing::debug!(listener = id.0, event = kind.as_str(), "Listener registered");
        id
    }

    /// Returns false if the id was never registered or already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            tracing::debug!(listener = id.0, "Listener removed");
        }
        removed
    }

    /// Deliver an event to every listener of its kind.
    ///
    /// Listeners whose receiving side has gone away are dropped.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.listeners.iter() {
            let (listener_kind, sender) = entry.value();
            if *listener_kind != kind {
                continue;
            }
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            self.listeners.remove(&id);
        }

        metrics::counter!("wallet_provider_events_total", "kind" => kind.as_str())
            .increment(1);
        delivered
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use tokio::sync::mpsc;

    #[test]
    fn test_emit_only_reaches_matching_kind() {
        let registry = ListenerRegistry::new();
        let (chain_tx, mut chain_rx) = mpsc::unbounded_channel();
        let (accounts_tx, mut accounts_rx) = mpsc::unbounded_channel();
        registry.add(EventKind::ChainChanged, chain_tx);
        registry.add(EventKind::AccountsChanged, accounts_tx);

        assert_eq!(registry.emit(ProviderEvent::ChainChanged(1)), 1);
        assert_eq!(chain_rx.try_recv().unwrap(), ProviderEvent::ChainChanged(1));
        assert!(accounts_rx.try_recv().is_err());

        registry.emit(ProviderEvent::AccountsChanged(vec![Address::ZERO]));
        assert_eq!(
            accounts_rx.try_recv().unwrap(),
            ProviderEvent::AccountsChanged(vec![Address::ZERO])
        );
    }

    #[test]
    fn test_remove_is_single_shot() {
        let registry = ListenerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.add(EventKind::ChainChanged, tx);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_listeners_are_pruned() {
        let registry = ListenerRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add(EventKind::ChainChanged, tx);
        drop(rx);

        assert_eq!(registry.emit(ProviderEvent::ChainChanged(5)), 0);
        assert_eq!(registry.len(), 0);
    }
}
