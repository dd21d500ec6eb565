//! Shutdown coordination for the demo page server.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The server and any test harness subscribe; OS signals or an explicit
/// [`Shutdown::trigger`] wake every subscriber.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve once the signal fires (or every sender is gone).
    pub async fn wait(mut rx: broadcast::Receiver<()>) {
        let _ = rx.recv().await;
    }

    /// Number of tasks still waiting on the signal.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
