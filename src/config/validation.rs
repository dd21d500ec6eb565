//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses, amounts and URLs parse
//! - Validate value ranges (timeouts > 0, gas limit covers a transfer)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DemoConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::utils::parse_ether;
use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::{DemoConfig, NetworkConfig, ProviderMode};

/// Minimum gas for a plain value transfer.
const TRANSFER_GAS: u64 = 21_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DemoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    let provider = &config.provider;
    if provider.enabled && provider.mode == ProviderMode::Rpc {
        if url::Url::parse(&provider.rpc_url).is_err() {
            errors.push(ValidationError::new(
                "provider.rpc_url",
                format!("'{}' is not a URL", provider.rpc_url),
            ));
        }
        if provider.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("provider.rpc_timeout_secs", "must be > 0"));
        }
    }
    if provider.enabled && provider.mode == ProviderMode::Browser {
        // Relay waits happen inside a request, so they must end before it times out.
        let limit = config.server.request_timeout_secs;
        for (name, value) in [
            ("relay_request_timeout_secs", provider.relay_request_timeout_secs),
            ("relay_poll_secs", provider.relay_poll_secs),
        ] {
            if value == 0 || value >= limit {
                errors.push(ValidationError::new(
                    format!("provider.{name}"),
                    format!("must be > 0 and below server.request_timeout_secs ({limit})"),
                ));
            }
        }
    }

    for (i, network) in config.networks.iter().enumerate() {
        validate_network(&format!("networks[{i}]"), network, &mut errors);
    }
    validate_network("target_network", &config.target_network, &mut errors);

    if config.transaction.recipient.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "transaction.recipient",
            format!("'{}' is not a 20-byte address", config.transaction.recipient),
        ));
    }
    if parse_ether(&config.transaction.value_ether).is_err() {
        errors.push(ValidationError::new(
            "transaction.value_ether",
            format!("'{}' is not an ether amount", config.transaction.value_ether),
        ));
    }
    if config.transaction.gas_limit < TRANSFER_GAS {
        errors.push(ValidationError::new(
            "transaction.gas_limit",
            format!("must be at least {TRANSFER_GAS}"),
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"json\"",
        ));
    }

    let automation = &config.automation;
    if automation.extension_id.len() != 32
        || !automation.extension_id.chars().all(|c| ('a'..='p').contains(&c))
    {
        errors.push(ValidationError::new(
            "automation.extension_id",
            "must be 32 characters in a-p",
        ));
    }
    if url::Url::parse(&automation.dapp_url).is_err() {
        errors.push(ValidationError::new("automation.dapp_url", "not a URL"));
    }
    let t = &automation.timeouts;
    for (name, value) in [
        ("test_ms", t.test_ms),
        ("page_load_ms", t.page_load_ms),
        ("popup_ms", t.popup_ms),
        ("action_ms", t.action_ms),
        ("tx_popup_ms", t.tx_popup_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(
                format!("automation.timeouts.{name}"),
                "must be > 0",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_network(field: &str, network: &NetworkConfig, errors: &mut Vec<ValidationError>) {
    if network.chain_id == 0 {
        errors.push(ValidationError::new(format!("{field}.chain_id"), "must be > 0"));
    }
    if network.rpc_urls.is_empty() {
        errors.push(ValidationError::new(
            format!("{field}.rpc_urls"),
            "at least one RPC URL is required",
        ));
    }
    for url in &network.rpc_urls {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new(
                format!("{field}.rpc_urls"),
                format!("'{url}' is not a URL"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&DemoConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = DemoConfig::default();
        config.transaction.recipient = "0x1234".to_string();
        config.transaction.value_ether = "lots".to_string();
        config.transaction.gas_limit = 100;
        config.automation.timeouts.popup_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"transaction.recipient"));
        assert!(fields.contains(&"transaction.value_ether"));
        assert!(fields.contains(&"transaction.gas_limit"));
        assert!(fields.contains(&"automation.timeouts.popup_ms"));
    }

    #[test]
    fn test_rpc_url_only_checked_in_rpc_mode() {
        let mut config = DemoConfig::default();
        config.provider.rpc_url = "not a url".to_string();
        assert!(validate_config(&config).is_ok());

        config.provider.mode = ProviderMode::Rpc;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "provider.rpc_url");

        config.provider.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_relay_waits_must_fit_in_a_request() {
        let mut config = DemoConfig::default();
        config.provider.relay_request_timeout_secs = config.server.request_timeout_secs;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "provider.relay_request_timeout_secs");

        config.provider.mode = ProviderMode::Rpc;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_extension_id() {
        let mut config = DemoConfig::default();
        config.automation.extension_id = "xyz".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("automation.extension_id"));
    }
}
