//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::DemoConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<DemoConfig, ConfigError> {
    let config: DemoConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load the file when a path is given, otherwise fall back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<DemoConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = DemoConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply command-line overrides to a loaded config and validate the result.
pub fn with_overrides<F>(mut config: DemoConfig, apply: F) -> Result<DemoConfig, ConfigError>
where
    F: FnOnce(&mut DemoConfig),
{
    apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [provider]
            enabled = true
            rpc_url = "http://127.0.0.1:8545"
            chain_id = 31337

            [transaction]
            value_ether = "0.5"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.provider.enabled);
        assert_eq!(config.transaction.value_ether, "0.5");
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config(
            r#"
            [transaction]
            recipient = "nope"
            gas_limit = 1
            "#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("transaction.recipient"));
        assert!(message.contains(", transaction.gas_limit"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_overrides_are_validated() {
        let config = load_or_default(None).unwrap();
        let err = with_overrides(config.clone(), |c| {
            c.automation.dapp_url = "localhost 5173".to_string();
        })
        .unwrap_err();
        assert!(err.to_string().contains("automation.dapp_url"));

        let config = with_overrides(config, |c| {
            c.automation.dapp_url = "http://127.0.0.1:8080".to_string();
        })
        .unwrap();
        assert_eq!(config.automation.dapp_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_no_path_uses_defaults() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:5173");
    }
}
