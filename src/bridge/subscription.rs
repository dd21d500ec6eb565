//! Scoped provider event registration.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::provider::{ListenerId, WalletProvider};

/// Listener registrations plus the task dispatching their events.
///
/// Released exactly once, either through [`Subscription::dispose`] or on drop.
pub struct Subscription {
    provider: Arc<dyn WalletProvider>,
    listener_ids: Vec<ListenerId>,
    task: Option<JoinHandle<()>>,
    released: bool,
}

impl Subscription {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        listener_ids: Vec<ListenerId>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            provider,
            listener_ids,
            task: Some(task),
            released: false,
        }
    }

    pub fn listener_ids(&self) -> &[ListenerId] {
        &self.listener_ids
    }

    /// Remove every listener and stop dispatching.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for id in &self.listener_ids {
            if !self.provider.remove_listener(*id) {
                tracing::warn!(listener = id.0, "Listener was already gone at teardown");
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(listeners = self.listener_ids.len(), "Provider subscription released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("listener_ids", &self.listener_ids)
            .field("released", &self.released)
            .finish()
    }
}
