//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on Unix, SIGTERM both mean "shut down gracefully".

use crate::lifecycle::shutdown::Shutdown;

/// Wait for a termination signal, then trigger `shutdown`.
pub async fn forward_signals(shutdown: Shutdown) {
    wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
