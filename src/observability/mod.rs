//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! bridge, provider, server, driver
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (outcome counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Seed phrases, passwords and keys are never logged
//! - Request ID flows through every page request

pub mod logging;
pub mod metrics;
