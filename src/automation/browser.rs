//! Chrome process management: fresh profile, extension loading, CDP attach.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::cdp::{CdpClient, CdpError, CdpEvent, PageSession};
use super::error::DriverError;
use crate::config::AutomationConfig;

/// Permissions the extension needs to read a pasted recovery phrase.
const CLIPBOARD_PERMISSIONS: &[&str] = &["clipboardReadWrite", "clipboardSanitizedWrite"];

const STARTUP_POLL: Duration = Duration::from_millis(200);

/// A launched Chrome with the wallet extension loaded.
pub struct Browser {
    client: CdpClient,
    child: Child,
}

impl Browser {
    /// Find a Chrome executable in the usual install locations.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Remove any previous profile so the extension starts from onboarding.
    pub fn prepare_profile(dir: &Path) -> Result<(), DriverError> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
            info!(path = %dir.display(), "Cleaned previous browser profile");
        }
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    /// Launch Chrome on a fresh profile with only the wallet extension enabled.
    pub async fn launch(config: &AutomationConfig) -> Result<Self, DriverError> {
        let extension_path = Path::new(&config.extension_path);
        if !extension_path.exists() {
            return Err(DriverError::ExtensionMissing(config.extension_path.clone()));
        }
        let extension_path = std::fs::canonicalize(extension_path)?;

        let chrome_path = match &config.chrome_path {
            Some(path) => PathBuf::from(path),
            None => Self::find_chrome().ok_or(DriverError::ChromeNotFound)?,
        };

        let profile_dir = Path::new(&config.profile_dir);
        Self::prepare_profile(profile_dir)?;
        let profile_dir = std::fs::canonicalize(profile_dir)?;

        info!(
            chrome = %chrome_path.display(),
            extension = %extension_path.display(),
            port = config.debug_port,
            "Launching Chrome"
        );

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--disable-extensions-except={}", extension_path.display()))
            .arg(format!("--load-extension={}", extension_path.display()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if config.headless {
            // Wallet extensions generally refuse to run without a window.
            warn!("Running headless; the extension UI may not render");
            cmd.arg("--headless=new");
        }

        let child = cmd.spawn().map_err(|e| DriverError::Launch(e.to_string()))?;
        debug!(pid = ?child.id(), "Chrome started");

        let endpoint = format!("http://127.0.0.1:{}", config.debug_port);
        let page_load = Duration::from_millis(config.timeouts.page_load_ms);
        wait_for_endpoint(&endpoint, page_load).await?;

        let client = CdpClient::connect(&endpoint, page_load).await?;
        client.discover_targets().await?;

        let mut origins = vec![format!("chrome-extension://{}", config.extension_id)];
        if let Ok(url) = url::Url::parse(&config.dapp_url) {
            origins.push(url.origin().ascii_serialization());
        }
        for origin in &origins {
            client.grant_permissions(origin, CLIPBOARD_PERMISSIONS).await?;
        }

        Ok(Self { client, child })
    }

    pub fn client(&self) -> &CdpClient {
        &self.client
    }

    pub async fn new_page(&self) -> Result<PageSession, CdpError> {
        self.client.new_page("about:blank").await
    }

    pub async fn attach(&self, target_id: &str) -> Result<PageSession, CdpError> {
        self.client.attach(target_id).await
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<CdpEvent> {
        self.client.subscribe()
    }

    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.client.close_target(target_id).await
    }

    /// Close the browser and make sure the process is gone.
    pub async fn close(mut self) {
        self.client.close_browser().await;
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Chrome exited"),
            _ => {
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill Chrome: {}", e);
                }
            }
        }
        info!("Browser closed");
    }
}

async fn wait_for_endpoint(endpoint: &str, limit: Duration) -> Result<(), DriverError> {
    let version_url = format!("{}/json/version", endpoint);
    let start = Instant::now();
    while start.elapsed() < limit {
        if reqwest::get(&version_url).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(STARTUP_POLL).await;
    }
    Err(DriverError::Launch(format!(
        "Chrome did not open {} within {}ms",
        endpoint,
        limit.as_millis()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_profile_removes_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("profile");
        std::fs::create_dir_all(profile.join("Default")).unwrap();
        std::fs::write(profile.join("Default/Preferences"), "{}").unwrap();

        Browser::prepare_profile(&profile).unwrap();

        assert!(profile.exists());
        assert_eq!(std::fs::read_dir(&profile).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_extension_fails_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutomationConfig {
            extension_path: dir.path().join("absent").display().to_string(),
            profile_dir: dir.path().join("profile").display().to_string(),
            ..Default::default()
        };

        let err = Browser::launch(&config).await.err().unwrap();
        assert!(matches!(err, DriverError::ExtensionMissing(_)));
        assert!(!dir.path().join("profile").exists());
    }
}
