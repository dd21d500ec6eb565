//! Demo page subsystem.
//!
//! # Data Flow
//! ```text
//! Browser / driver / SDK
//!     → server.rs (Axum router, request ID, timeout, trace)
//!     → handlers.rs (form actions and JSON API)
//!     → WalletBridge
//!     → page.rs (HTML) or PageView (JSON)
//! ```

pub mod handlers;
pub mod page;
pub mod request;
pub mod server;

pub use request::{RequestIdMaker, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
