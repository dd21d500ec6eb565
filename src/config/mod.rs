//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DemoConfig (validated, immutable)
//!     → shared by value with the server, bridge and driver
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets (seed phrase, private key, wallet password) never live here;
//!   they are read from environment variables by the code that needs them

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, with_overrides, ConfigError};
pub use schema::{
    AutomationConfig, AutomationTimeouts, BridgeConfig, DemoConfig, NetworkConfig,
    ObservabilityConfig, ProviderConfig, ProviderMode, ServerConfig, TransactionConfig,
};
pub use validation::{validate_config, ValidationError};
