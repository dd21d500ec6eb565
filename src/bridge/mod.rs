//! Wallet bridge subsystem.
//!
//! # Data Flow
//! ```text
//! page action (connect / send / switch)
//!     → core.rs (WalletBridge, one provider request at a time)
//!     → provider (accounts, chain, signer)
//!     → state.rs (ConnectionState, TransactionRecord, Notice)
//!     → view.rs (PageView for rendering)
//!
//! provider events (chainChanged / accountsChanged)
//!     → subscription.rs (listeners + dispatch task)
//!     → core.rs (refresh network / replace account)
//! ```

pub mod core;
pub mod state;
pub mod subscription;
pub mod view;

pub use self::core::{BridgeSettings, WalletBridge};
pub use state::{ConnectionState, Notice, TransactionRecord};
pub use subscription::Subscription;
pub use view::PageView;
