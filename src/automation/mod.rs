//! End-to-end automation of the wallet extension and the demo page.
//!
//! # Data Flow
//! ```text
//! wallet-e2e binary
//!     → driver.rs (phase script, run timeout, screenshot on failure)
//!     → browser.rs (fresh profile, Chrome + extension, CDP attach)
//!     → locator.rs (find / wait / click / fill / check in-page)
//!     → popup.rs (new-window and window-closed detection)
//!     → cdp/ (JSON-RPC over the DevTools WebSocket)
//! ```

pub mod browser;
pub mod cdp;
pub mod driver;
pub mod error;
pub mod locator;
pub mod phases;
pub mod popup;

pub use browser::Browser;
pub use driver::{Driver, RunReport, ScreenshotSource, Secrets, PASSWORD_ENV, SEED_PHRASE_ENV};
pub use error::DriverError;
pub use locator::Locator;
pub use phases::Phase;
