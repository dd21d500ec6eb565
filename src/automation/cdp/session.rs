//! Page session: commands scoped to one attached target.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use super::client::Connection;
use super::error::CdpError;
use super::protocol::{Key, MouseEventType};

/// A session attached to a single page/target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    conn: Arc<Connection>,
}

impl PageSession {
    pub(crate) fn new(target_id: String, session_id: String, conn: Arc<Connection>) -> Self {
        Self {
            target_id,
            session_id,
            conn,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, Some(&self.session_id)).await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        Ok(())
    }

    /// Navigate to URL and wait until the document is usable.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText") {
            return Err(CdpError::NavigationFailed(format!(
                "{}: {}",
                url,
                error.as_str().unwrap_or("Unknown error")
            )));
        }

        self.wait_for_load(timeout).await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Poll `document.readyState` until interactive or complete.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();

        loop {
            // The execution context is torn down mid-navigation; retry.
            if let Ok(result) = self.evaluate("document.readyState").await {
                if matches!(result.as_str(), Some("complete") | Some("interactive")) {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                    "userGesture": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Press and release the left mouse button at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    pub async fn press_key(&self, key: Key) -> Result<(), CdpError> {
        for event in ["rawKeyDown", "keyUp"] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": event,
                    "key": key.name(),
                    "code": key.name(),
                    "windowsVirtualKeyCode": key.virtual_key_code(),
                })),
            )
            .await?;
        }
        Ok(())
    }

    /// Insert text at the focused element as if typed.
    pub async fn insert_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    /// Capture the viewport as PNG bytes.
    pub async fn screenshot_png(&self) -> Result<Vec<u8>, CdpError> {
        let result = self
            .call("Page.captureScreenshot", Some(json!({"format": "png"})))
            .await?;
        let data = result["data"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
    }

    /// Bring the page's window to the front.
    pub async fn bring_to_front(&self) -> Result<(), CdpError> {
        self.call("Page.bringToFront", None).await?;
        Ok(())
    }
}
