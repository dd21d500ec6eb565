//! Key loading for the RPC-backed provider.
//!
//! # Security
//! - Seed phrases and private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use crate::provider::types::{ProviderError, ProviderResult};

/// Environment variable holding a BIP-39 seed phrase.
pub const MNEMONIC_ENV_VAR: &str = "WALLET_DEMO_MNEMONIC";

/// Environment variable holding a hex private key (used when no phrase is set).
pub const PRIVATE_KEY_ENV_VAR: &str = "WALLET_DEMO_PRIVATE_KEY";

/// Local signing key for the provider's single account.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key (with or without 0x).
    pub fn from_private_key(private_key_hex: &str) -> ProviderResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ProviderError::Signer(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Wallet initialized from private key");
        Ok(Self { signer })
    }

    /// Derive the first account (`m/44'/60'/0'/0/0`) from a seed phrase.
    pub fn from_mnemonic(phrase: &str) -> ProviderResult<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(0)
            .map_err(|e| ProviderError::Signer(format!("Invalid derivation path: {}", e)))?
            .build()
            .map_err(|e| ProviderError::Signer(format!("Invalid seed phrase: {}", e)))?;

        tracing::info!(address = %signer.address(), "Wallet initialized from seed phrase");
        Ok(Self { signer })
    }

    /// Load from `WALLET_DEMO_MNEMONIC`, falling back to `WALLET_DEMO_PRIVATE_KEY`.
    pub fn from_env() -> ProviderResult<Self> {
        if let Ok(phrase) = std::env::var(MNEMONIC_ENV_VAR) {
            return Self::from_mnemonic(&phrase);
        }
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ProviderError::Signer(format!(
                "Neither {} nor {} is set",
                MNEMONIC_ENV_VAR, PRIVATE_KEY_ENV_VAR
            ))
        })?;
        Self::from_private_key(&private_key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Network wallet used by alloy's signing filler.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key and phrase (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_from_mnemonic_matches_key() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key");
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_invalid_mnemonic() {
        let result = Wallet::from_mnemonic("not a real phrase");
        assert!(matches!(result, Err(ProviderError::Signer(_))));
    }
}
