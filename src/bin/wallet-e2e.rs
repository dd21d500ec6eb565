//! Wallet extension automation driver.
//!
//! Launches Chrome with the unpacked wallet extension on a fresh profile,
//! imports the wallet from `WALLET_E2E_SEED_PHRASE` / `WALLET_E2E_PASSWORD`,
//! then connects the demo page and sends its test transaction. Exits non-zero
//! on the first failed phase, after saving a screenshot.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use wallet_demo::automation::{Driver, Secrets};
use wallet_demo::config::{load_or_default, with_overrides};
use wallet_demo::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "wallet-e2e")]
#[command(about = "Drive the wallet extension through setup, connect and send", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `automation.dapp_url`.
    #[arg(long)]
    dapp_url: Option<String>,

    /// Override `automation.extension_path`.
    #[arg(long)]
    extension_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = with_overrides(load_or_default(cli.config.as_deref())?, |config| {
        if let Some(url) = cli.dapp_url {
            config.automation.dapp_url = url;
        }
        if let Some(path) = cli.extension_path {
            config.automation.extension_path = path;
        }
    })?;

    logging::init(&config.observability)?;
    metrics::init(&config.observability);

    let secrets = Secrets::from_env()?;
    let driver = Driver::new(config.automation, secrets);

    match driver.run().await {
        Ok(report) => {
            tracing::info!(
                phases = report.completed.len(),
                connect_popup = report.connect_popup,
                transaction_popup = report.transaction_popup,
                tx_status = report.tx_status.as_deref().unwrap_or("-"),
                "Automation completed"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(phase = ?e.phase(), "wallet-e2e exiting with failure");
            Ok(ExitCode::FAILURE)
        }
    }
}
