use thiserror::Error;

use super::cdp::CdpError;
use super::phases::Phase;

/// Errors that end an automation run.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Environment variable {0} is not set")]
    MissingSecret(&'static str),

    #[error("Wallet extension not found at {0}")]
    ExtensionMissing(String),

    #[error("Chrome executable not found")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    Launch(String),

    #[error("{phase}: expected {expected} to be present")]
    Precondition { phase: Phase, expected: String },

    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: CdpError,
    },

    #[error("Run exceeded {0}ms")]
    Timeout(u64),

    #[error("CDP error: {0}")]
    Cdp(#[from] CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// The phase the failure happened in, when known.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Precondition { phase, .. } | Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
