//! Wallet-connect demo page and wallet-extension automation driver.

pub mod automation;
pub mod bridge;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;

pub use bridge::WalletBridge;
pub use config::DemoConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use provider::WalletProvider;
