//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for both binaries
//! - Pick JSON or pretty output from config
//! - Let `RUST_LOG` override the configured filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Returns an error if one is already set.
pub fn init(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}
