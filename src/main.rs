//! Wallet demo page server.
//!
//! Serves a single page with a connect button, a send button and a status
//! region, all backed by the [`WalletBridge`](wallet_demo::WalletBridge).
//!
//! ```text
//!   Browser / wallet-e2e ──▶ axum router ──▶ WalletBridge ──▶ WalletProvider
//!          ▲                      ▲                               │
//!          │                      └──────── page / JSON ◀─────────┤
//!          └───── /relay/* (window.ethereum in browser mode) ◀────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use wallet_demo::config::load_or_default;
use wallet_demo::lifecycle::signals::forward_signals;
use wallet_demo::lifecycle::{build_bridge, build_provider};
use wallet_demo::observability::{logging, metrics};
use wallet_demo::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "wallet-demo")]
#[command(about = "Wallet-connect demo page", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init(&config.observability)?;
    tracing::info!("wallet-demo v{} starting", env!("CARGO_PKG_VERSION"));
    metrics::init(&config.observability);

    tracing::info!(
        bind_address = %config.server.bind_address,
        provider_enabled = config.provider.enabled,
        provider_mode = ?config.provider.mode,
        "Configuration loaded"
    );

    let built = build_provider(&config)?;
    let bridge = build_bridge(&config, built.provider)?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(forward_signals(shutdown));

    let server = HttpServer::with_relay(&config.server, bridge, built.relay);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
