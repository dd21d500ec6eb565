//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wallet_connect_total` (counter): connect attempts by outcome
//! - `wallet_tx_submitted_total` (counter): send attempts by outcome
//! - `wallet_provider_events_total` (counter): provider notifications by kind
//! - `automation_phase_total` (counter): driver phases by phase and outcome
//!
//! Recording goes through the `metrics` facade and is a no-op until an
//! exporter is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::ObservabilityConfig;

/// Start the Prometheus endpoint if enabled. Failures are logged, not fatal.
pub fn init(config: &ObservabilityConfig) {
    if !config.metrics_enabled {
        return;
    }

    let addr: SocketAddr = match config.metrics_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(
                metrics_address = %config.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            );
            return;
        }
    };

    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a finished automation phase.
pub fn record_phase(phase: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    ::metrics::counter!("automation_phase_total", "phase" => phase, "outcome" => outcome)
        .increment(1);
}
