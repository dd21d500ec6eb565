//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build provider → Build + subscribe bridge → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Tear down bridge subscription → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_bridge, build_provider, BuiltProvider, StartupError};
