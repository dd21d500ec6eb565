//! The named steps of an automation run and what each expects on screen.

use std::fmt;

use super::locator::Locator;

/// Identifies the wallet extension's onboarding checkboxes.
pub(crate) const CHECKBOX: &str = r#"input[type="checkbox"]"#;
pub(crate) const PASSWORD_INPUT: &str = r#"input[type="password"]"#;
pub(crate) const ACCOUNT_MENU: &str = r#"[data-testid="account-options-menu-button"]"#;

/// Demo page element ids.
pub(crate) const CONNECT_BUTTON: &str = "#connect-wallet-button";
pub(crate) const SEND_BUTTON: &str = "#send-tx-button";
pub(crate) const TX_STATUS: &str = "#tx-status";

/// One step of the run. Phases execute strictly in [`Phase::SCRIPT`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    FreshProfile,
    InitializeWallet,
    AcceptTerms,
    SelectImport,
    ImportSeed,
    SetupPassword,
    CompleteSetup,
    ConfigureNetwork,
    ConnectDapp,
    ExecuteTransaction,
}

impl Phase {
    pub const SCRIPT: [Phase; 10] = [
        Phase::FreshProfile,
        Phase::InitializeWallet,
        Phase::AcceptTerms,
        Phase::SelectImport,
        Phase::ImportSeed,
        Phase::SetupPassword,
        Phase::CompleteSetup,
        Phase::ConfigureNetwork,
        Phase::ConnectDapp,
        Phase::ExecuteTransaction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FreshProfile => "fresh_profile",
            Self::InitializeWallet => "initialize_wallet",
            Self::AcceptTerms => "accept_terms",
            Self::SelectImport => "select_import",
            Self::ImportSeed => "import_seed",
            Self::SetupPassword => "setup_password",
            Self::CompleteSetup => "complete_setup",
            Self::ConfigureNetwork => "configure_network",
            Self::ConnectDapp => "connect_dapp",
            Self::ExecuteTransaction => "execute_transaction",
        }
    }

    /// Element that must be present when the phase starts.
    ///
    /// Phases that navigate first have no precondition; their first wait
    /// happens after the page loads.
    pub fn precondition(&self) -> Option<Locator> {
        match self {
            Self::FreshProfile | Self::InitializeWallet | Self::ConnectDapp => None,
            Self::AcceptTerms => Some(Locator::css(CHECKBOX)),
            Self::SelectImport => Some(Locator::text("I have an existing wallet")),
            Self::ImportSeed => Some(Locator::button("Paste")),
            Self::SetupPassword => Some(Locator::css(PASSWORD_INPUT)),
            Self::CompleteSetup => Some(Locator::button("I agree")),
            Self::ConfigureNetwork => Some(Locator::css(ACCOUNT_MENU)),
            Self::ExecuteTransaction => Some(Locator::css(SEND_BUTTON)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_starts_fresh_and_ends_with_transaction() {
        assert_eq!(Phase::SCRIPT.first(), Some(&Phase::FreshProfile));
        assert_eq!(Phase::SCRIPT.last(), Some(&Phase::ExecuteTransaction));

        let connect = Phase::SCRIPT.iter().position(|p| *p == Phase::ConnectDapp);
        let network = Phase::SCRIPT.iter().position(|p| *p == Phase::ConfigureNetwork);
        assert!(network < connect);
    }

    #[test]
    fn test_phase_names_are_unique() {
        let mut names: Vec<_> = Phase::SCRIPT.iter().map(Phase::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Phase::SCRIPT.len());
    }

    #[test]
    fn test_preconditions() {
        assert_eq!(Phase::InitializeWallet.precondition(), None);
        assert_eq!(
            Phase::ImportSeed.precondition(),
            Some(Locator::button("Paste"))
        );
        assert_eq!(
            Phase::ExecuteTransaction.precondition(),
            Some(Locator::css("#send-tx-button"))
        );
    }
}
