//! Minimal Chrome DevTools Protocol client.
//!
//! One WebSocket per browser; page sessions multiplex over it using
//! flattened `sessionId`s. Events fan out on a broadcast channel so the
//! driver can watch for popup windows.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpEvent, Key, TargetInfo};
pub use session::PageSession;
