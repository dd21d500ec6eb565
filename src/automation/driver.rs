//! Runs the phase script against a live browser.
//!
//! # Failure model
//! - A phase either completes or ends the run; nothing is retried
//! - On failure the main page is captured to `screenshot_path` first
//! - The browser is closed on every exit path
//! - Popup absence during connect or send is a normal outcome

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::browser::Browser;
use super::cdp::{CdpError, CdpEvent, Key, PageSession, TargetInfo};
use super::error::DriverError;
use super::locator::Locator;
use super::phases::{
    Phase, ACCOUNT_MENU, CHECKBOX, CONNECT_BUTTON, PASSWORD_INPUT, SEND_BUTTON, TX_STATUS,
};
use super::popup::{wait_for_new_page, wait_for_target_closed};
use crate::config::{AutomationConfig, AutomationTimeouts};
use crate::observability::metrics::record_phase;

pub const SEED_PHRASE_ENV: &str = "WALLET_E2E_SEED_PHRASE";
pub const PASSWORD_ENV: &str = "WALLET_E2E_PASSWORD";

/// Credentials typed into the extension. Never logged.
#[derive(Clone)]
pub struct Secrets {
    seed_phrase: String,
    password: String,
}

impl Secrets {
    pub fn new(seed_phrase: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            seed_phrase: seed_phrase.into(),
            password: password.into(),
        }
    }

    /// Read both secrets from the environment, failing on the first missing one.
    pub fn from_env() -> Result<Self, DriverError> {
        let seed_phrase = read_secret(SEED_PHRASE_ENV)?;
        let password = read_secret(PASSWORD_ENV)?;
        Ok(Self::new(seed_phrase, password))
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("seed_phrase", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

fn read_secret(name: &'static str) -> Result<String, DriverError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(DriverError::MissingSecret(name)),
    }
}

/// What a successful run observed.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<Phase>,
    /// The connect flow went through an approval popup.
    pub connect_popup: bool,
    /// The send flow went through an approval popup.
    pub transaction_popup: bool,
    /// Status line the demo page showed after sending, if any.
    pub tx_status: Option<String>,
    pub elapsed: Duration,
}

/// Drives one end-to-end run.
pub struct Driver {
    config: AutomationConfig,
    secrets: Secrets,
}

impl Driver {
    pub fn new(config: AutomationConfig, secrets: Secrets) -> Self {
        Self { config, secrets }
    }

    /// Run every phase in order within the overall test timeout.
    pub async fn run(&self) -> Result<RunReport, DriverError> {
        let started = Instant::now();
        let limit = Duration::from_millis(self.config.timeouts.test_ms);
        info!("Starting wallet automation");

        let launched = tokio::time::timeout(limit, Browser::launch(&self.config)).await;
        let browser = match launched {
            Ok(Ok(browser)) => {
                record_phase(Phase::FreshProfile.name(), true);
                browser
            }
            Ok(Err(e)) => {
                record_phase(Phase::FreshProfile.name(), false);
                return Err(e);
            }
            Err(_) => {
                record_phase(Phase::FreshProfile.name(), false);
                return Err(DriverError::Timeout(self.config.timeouts.test_ms));
            }
        };

        let mut run = Run {
            browser: &browser,
            config: &self.config,
            timeouts: &self.config.timeouts,
            secrets: &self.secrets,
            page: None,
            report: RunReport {
                completed: vec![Phase::FreshProfile],
                ..Default::default()
            },
        };

        let remaining = limit.saturating_sub(started.elapsed());
        let outcome = match tokio::time::timeout(remaining, run.script()).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(self.config.timeouts.test_ms)),
        };

        let outcome = match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                let path = Path::new(&self.config.screenshot_path);
                Err(capture_failure(e, run.page.as_ref(), path).await)
            }
        };

        let mut report = run.report;
        drop(run.page);
        browser.close().await;

        outcome?;
        report.elapsed = started.elapsed();
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "Wallet automation completed");
        Ok(report)
    }
}

/// Anything that can render the current page as a PNG.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn screenshot_png(&self) -> Result<Vec<u8>, CdpError>;
}

#[async_trait]
impl ScreenshotSource for PageSession {
    async fn screenshot_png(&self) -> Result<Vec<u8>, CdpError> {
        PageSession::screenshot_png(self).await
    }
}

/// Log a failed run and save a screenshot of `page` before handing the
/// error back. A screenshot that cannot be taken is only logged.
pub async fn capture_failure<S>(error: DriverError, page: Option<&S>, path: &Path) -> DriverError
where
    S: ScreenshotSource + ?Sized,
{
    error!(phase = ?error.phase(), "Automation failed: {}", error);
    if let Some(page) = page {
        capture_screenshot(page, path).await;
    }
    error
}

async fn capture_screenshot<S>(page: &S, path: &Path)
where
    S: ScreenshotSource + ?Sized,
{
    match page.screenshot_png().await {
        Ok(png) => match tokio::fs::write(path, png).await {
            Ok(()) => info!(path = %path.display(), "Saved failure screenshot"),
            Err(e) => warn!("Failed to write screenshot: {}", e),
        },
        Err(e) => warn!("Failed to capture screenshot: {}", e),
    }
}

/// Record a phase's outcome and tag a failure with the phase it ended.
fn phase_outcome(phase: Phase, result: Result<(), CdpError>) -> Result<(), DriverError> {
    record_phase(phase.name(), result.is_ok());
    result.map_err(|source| DriverError::Phase { phase, source })
}

/// State of a run in progress.
struct Run<'a> {
    browser: &'a Browser,
    config: &'a AutomationConfig,
    timeouts: &'a AutomationTimeouts,
    secrets: &'a Secrets,
    page: Option<PageSession>,
    report: RunReport,
}

impl Run<'_> {
    async fn script(&mut self) -> Result<(), DriverError> {
        let page = self
            .browser
            .new_page()
            .await
            .map_err(|source| DriverError::Phase {
                phase: Phase::InitializeWallet,
                source,
            })?;
        self.page = Some(page);

        for phase in Phase::SCRIPT.into_iter().skip(1) {
            self.run_phase(phase).await?;
            self.report.completed.push(phase);
        }
        Ok(())
    }

    async fn run_phase(&mut self, phase: Phase) -> Result<(), DriverError> {
        info!(%phase, "Starting phase");

        if let Some(expected) = phase.precondition() {
            let present = self.page()?.wait_for(&expected, self.action()).await;
            if present.is_err() {
                record_phase(phase.name(), false);
                return Err(DriverError::Precondition {
                    phase,
                    expected: expected.to_string(),
                });
            }
        }

        let result = match phase {
            Phase::FreshProfile => Ok(()),
            Phase::InitializeWallet => self.initialize_wallet().await,
            Phase::AcceptTerms => self.accept_terms().await,
            Phase::SelectImport => self.select_import().await,
            Phase::ImportSeed => self.import_seed().await,
            Phase::SetupPassword => self.setup_password().await,
            Phase::CompleteSetup => self.complete_setup().await,
            Phase::ConfigureNetwork => self.configure_network().await,
            Phase::ConnectDapp => self.connect_dapp().await,
            Phase::ExecuteTransaction => self.execute_transaction().await,
        };

        phase_outcome(phase, result)
    }

    fn page(&self) -> Result<&PageSession, CdpError> {
        self.page.as_ref().ok_or(CdpError::SessionClosed)
    }

    fn action(&self) -> Duration {
        Duration::from_millis(self.timeouts.action_ms)
    }

    fn page_load(&self) -> Duration {
        Duration::from_millis(self.timeouts.page_load_ms)
    }

    fn popup(&self) -> Duration {
        Duration::from_millis(self.timeouts.popup_ms)
    }

    async fn initialize_wallet(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        let home = format!("chrome-extension://{}/home.html", self.config.extension_id);
        page.navigate(&home, self.page_load()).await?;
        page.click(&Locator::button("Get started"), self.page_load()).await
    }

    async fn accept_terms(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        // Return focus to the body so End scrolls the terms to the bottom.
        page.evaluate("document.activeElement && document.activeElement.blur()")
            .await?;
        page.press_key(Key::End).await?;
        page.check(&Locator::css(CHECKBOX), self.action()).await?;
        page.click(&Locator::button("Agree"), self.action()).await
    }

    async fn select_import(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        page.click(&Locator::text("I have an existing wallet"), self.action())
            .await?;
        page.click(
            &Locator::text("Import using Secret Recovery Phrase"),
            self.action(),
        )
        .await
    }

    async fn import_seed(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        info!("Importing seed phrase");
        page.bring_to_front().await?;
        let literal = Value::String(self.secrets.seed_phrase.clone()).to_string();
        page.evaluate(&format!("navigator.clipboard.writeText({})", literal))
            .await?;
        page.click(&Locator::button("Paste"), self.action()).await?;
        page.click(&Locator::button("Continue"), self.action()).await
    }

    async fn setup_password(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        info!("Setting up wallet password");
        let password = &self.secrets.password;
        page.fill(&Locator::nth(PASSWORD_INPUT, 0), password, self.action())
            .await?;
        page.fill(&Locator::nth(PASSWORD_INPUT, 1), password, self.action())
            .await?;
        page.check(&Locator::css(CHECKBOX), self.action()).await?;
        page.click(&Locator::button("Create Password"), self.action())
            .await
    }

    async fn complete_setup(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        info!("Completing wallet setup");
        page.click(&Locator::button("I agree"), self.action()).await?;
        page.click(&Locator::button("Done"), self.action()).await?;
        page.click(&Locator::button("Done"), self.action()).await
    }

    async fn configure_network(&self) -> Result<(), CdpError> {
        let page = self.page()?;
        info!(network = %self.config.network_label, "Configuring test network");
        page.click(&Locator::css(ACCOUNT_MENU), self.action()).await?;
        page.click(&Locator::text("Networks"), self.action()).await?;

        let toggle = Locator::nth(CHECKBOX, 0);
        if page.is_visible(&toggle).await {
            page.force_click(&toggle, self.action()).await?;
        }

        page.press_key(Key::Escape).await?;
        page.click(&Locator::text("Enabled Networks"), self.action())
            .await?;
        page.click(&Locator::text("Custom"), self.action()).await?;
        page.click(
            &Locator::exact_text(self.config.network_label.as_str()),
            self.action(),
        )
        .await?;
        page.press_key(Key::Escape).await
    }

    async fn connect_dapp(&mut self) -> Result<(), CdpError> {
        let connect_popup = {
            let page = self.page()?;
            info!(url = %self.config.dapp_url, "Connecting to demo page");
            page.navigate(&self.config.dapp_url, self.page_load()).await?;
            tokio::time::sleep(Duration::from_millis(self.timeouts.settle_ms)).await;

            let button = Locator::css(CONNECT_BUTTON);
            page.wait_for(&button, self.page_load()).await?;

            let mut events = self.browser.subscribe_events();
            page.click(&button, self.action()).await?;

            match wait_for_new_page(&mut events, self.action()).await {
                Some(target) => match self.approve_connection(&target, &mut events).await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("Connect popup not completed: {}", e);
                        false
                    }
                },
                None => false,
            }
        };

        if connect_popup {
            info!("Wallet connected via popup");
        } else {
            info!("Wallet connected directly (no popup required)");
        }
        self.report.connect_popup = connect_popup;
        Ok(())
    }

    async fn approve_connection(
        &self,
        target: &TargetInfo,
        events: &mut broadcast::Receiver<CdpEvent>,
    ) -> Result<(), CdpError> {
        let popup = self.browser.attach(&target.target_id).await?;
        let connect = Locator::button("Connect");
        popup.wait_for(&connect, self.popup()).await?;

        let next = Locator::button("Next");
        if popup.is_visible(&next).await {
            popup.click(&next, self.action()).await?;
        }
        popup.click(&connect, self.popup()).await?;

        if wait_for_target_closed(events, &target.target_id, self.popup()).await {
            Ok(())
        } else {
            Err(CdpError::Timeout("Connect popup did not close".to_string()))
        }
    }

    async fn execute_transaction(&mut self) -> Result<(), CdpError> {
        let (transaction_popup, tx_status) = {
            let page = self.page()?;
            info!("Executing test transaction");

            let mut events = self.browser.subscribe_events();
            page.click(&Locator::css(SEND_BUTTON), self.action()).await?;

            let tx_popup = Duration::from_millis(self.timeouts.tx_popup_ms);
            let transaction_popup = match wait_for_new_page(&mut events, tx_popup).await {
                Some(target) => {
                    self.approve_transaction(&target).await?;
                    true
                }
                None => {
                    info!("No approval popup; transaction needed no confirmation");
                    false
                }
            };

            let post_tx = Duration::from_millis(self.timeouts.post_tx_ms);
            let tx_status = match page.wait_for(&Locator::text("Transaction sent!"), post_tx).await {
                Ok(()) => page.text_of(&Locator::css(TX_STATUS)).await?,
                Err(_) => None,
            };
            (transaction_popup, tx_status)
        };

        match &tx_status {
            Some(status) => info!(status = %status, "Demo page status"),
            None => warn!("Demo page did not show a transaction hash"),
        }
        self.report.transaction_popup = transaction_popup;
        self.report.tx_status = tx_status;
        Ok(())
    }

    async fn approve_transaction(&self, target: &TargetInfo) -> Result<(), CdpError> {
        let popup = self.browser.attach(&target.target_id).await?;
        let confirm = Locator::button("Confirm");
        popup.wait_for(&confirm, self.page_load()).await?;
        tokio::time::sleep(Duration::from_millis(self.timeouts.confirm_delay_ms)).await;
        popup.click(&confirm, self.action()).await?;

        let submitted = Locator::text("Transaction submitted");
        if popup.wait_visible(&submitted, self.action()).await.is_ok() {
            info!("Transaction submitted successfully");
        } else {
            info!("Transaction is processing");
        }

        // The extension may already have closed the window itself.
        if let Err(e) = self.browser.close_target(&target.target_id).await {
            debug!("Popup already closed: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets::new("test test test junk", "hunter2");
        let shown = format!("{:?}", secrets);
        assert!(!shown.contains("junk"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_missing_secret_names_the_variable() {
        let err = read_secret("WALLET_E2E_TEST_UNSET_SECRET").unwrap_err();
        assert!(err.to_string().contains("WALLET_E2E_TEST_UNSET_SECRET"));
    }

    struct StaticPage(Option<&'static [u8]>);

    #[async_trait]
    impl ScreenshotSource for StaticPage {
        async fn screenshot_png(&self) -> Result<Vec<u8>, CdpError> {
            self.0
                .map(<[u8]>::to_vec)
                .ok_or(CdpError::SessionClosed)
        }
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    #[tokio::test]
    async fn test_failed_phase_saves_screenshot_then_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failure.png");

        let failed = phase_outcome(
            Phase::ConnectDapp,
            Err(CdpError::ElementNotFound("#connect-wallet-button".to_string())),
        )
        .unwrap_err();
        let err = capture_failure(failed, Some(&StaticPage(Some(PNG))), &path).await;

        assert!(matches!(
            err,
            DriverError::Phase {
                phase: Phase::ConnectDapp,
                source: CdpError::ElementNotFound(_)
            }
        ));
        assert_eq!(err.phase(), Some(Phase::ConnectDapp));
        assert_eq!(std::fs::read(&path).unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_screenshot_failure_keeps_phase_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failure.png");

        let failed = phase_outcome(Phase::ExecuteTransaction, Err(CdpError::SessionClosed))
            .unwrap_err();
        let err = capture_failure(failed, Some(&StaticPage(None)), &path).await;

        assert_eq!(err.phase(), Some(Phase::ExecuteTransaction));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_no_page_means_no_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failure.png");

        let err = capture_failure::<StaticPage>(DriverError::Timeout(10), None, &path).await;

        assert!(matches!(err, DriverError::Timeout(10)));
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_phase_is_not_an_error() {
        assert!(phase_outcome(Phase::AcceptTerms, Ok(())).is_ok());
    }

    #[tokio::test]
    async fn test_missing_extension_is_reported_without_browser() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutomationConfig {
            extension_path: dir.path().join("absent").display().to_string(),
            profile_dir: dir.path().join("profile").display().to_string(),
            ..Default::default()
        };
        let driver = Driver::new(config, Secrets::new("seed", "password"));

        let err = driver.run().await.unwrap_err();
        assert!(matches!(err, DriverError::ExtensionMissing(_)));
    }
}
