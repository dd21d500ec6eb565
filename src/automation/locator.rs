//! Element locators evaluated in-page, and the page actions built on them.
//!
//! Every locator compiles to a JavaScript expression yielding the element
//! or `null`. Actions auto-wait for the element to become visible before
//! interacting, and clicks are real mouse events at the element's centre.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::cdp::{CdpError, PageSession};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to find one element on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// First element matching a CSS selector.
    Css(String),
    /// The n-th (zero-based) element matching a CSS selector.
    Nth(String, usize),
    /// A button whose text contains the given label.
    ButtonText(String),
    /// The innermost element whose text contains the given string.
    Text(String),
    /// An element whose trimmed text is exactly the given string.
    ExactText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self::Nth(selector.into(), index)
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::ButtonText(label.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::ExactText(text.into())
    }

    /// JavaScript expression evaluating to the element or `null`.
    pub fn finder(&self) -> String {
        match self {
            Self::Css(selector) => format!("document.querySelector({})", js_str(selector)),
            Self::Nth(selector, index) => format!(
                "(document.querySelectorAll({})[{}] || null)",
                js_str(selector),
                index
            ),
            Self::ButtonText(label) => format!(
                "(() => {{ const t = {}; \
                 const all = Array.from(document.querySelectorAll('button, [role=\"button\"]')) \
                 .filter(e => (e.innerText || e.textContent || '').includes(t)); \
                 return all.find(e => e.offsetParent !== null) || all[0] || null; }})()",
                js_str(label)
            ),
            Self::Text(text) => format!(
                "(() => {{ const t = {}; \
                 const has = e => (e.innerText || e.textContent || '').includes(t); \
                 const all = Array.from(document.querySelectorAll('body *')) \
                 .filter(e => has(e) && !Array.from(e.children).some(has)); \
                 return all.find(e => e.offsetParent !== null) || all[0] || null; }})()",
                js_str(text)
            ),
            Self::ExactText(text) => format!(
                "(() => {{ const t = {}; \
                 const all = Array.from(document.querySelectorAll('body *')) \
                 .filter(e => (e.innerText || e.textContent || '').trim() === t); \
                 return all.find(e => e.offsetParent !== null) || all[0] || null; }})()",
                js_str(text)
            ),
        }
    }

    fn apply(&self, body: &str) -> String {
        format!("((el) => {{ {} }})({})", body, self.finder())
    }

    pub fn exists_js(&self) -> String {
        self.apply("return el !== null;")
    }

    pub fn visible_js(&self) -> String {
        self.apply(
            "if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             const s = window.getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
        )
    }

    pub fn center_js(&self) -> String {
        self.apply(
            "if (!el) return null; \
             el.scrollIntoView({block: 'center', inline: 'center'}); \
             const r = el.getBoundingClientRect(); \
             return {x: r.left + r.width / 2, y: r.top + r.height / 2};",
        )
    }

    pub fn js_click_js(&self) -> String {
        self.apply("if (!el) return false; el.click(); return true;")
    }

    pub fn focus_js(&self) -> String {
        self.apply(
            "if (!el) return false; el.focus(); \
             if (typeof el.select === 'function') el.select(); return true;",
        )
    }

    pub fn checked_js(&self) -> String {
        self.apply("return !!(el && el.checked);")
    }

    pub fn text_js(&self) -> String {
        self.apply("return el ? (el.innerText || el.textContent || '') : null;")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{}", selector),
            Self::Nth(selector, index) => write!(f, "{} >> nth={}", selector, index),
            Self::ButtonText(label) => write!(f, "button:has-text({:?})", label),
            Self::Text(text) => write!(f, "text={}", text),
            Self::ExactText(text) => write!(f, "text={:?}", text),
        }
    }
}

/// Quote a string as a JavaScript literal.
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

impl PageSession {
    /// Wait until the locator matches an element.
    pub async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), CdpError> {
        self.poll_true(&locator.exists_js(), locator, timeout).await
    }

    /// Wait until the locator matches a visible element.
    pub async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> Result<(), CdpError> {
        self.poll_true(&locator.visible_js(), locator, timeout).await
    }

    async fn poll_true(
        &self,
        expression: &str,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), CdpError> {
        let start = Instant::now();
        loop {
            // Evaluation fails while the page navigates; keep polling.
            if let Ok(Value::Bool(true)) = self.evaluate(expression).await {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(CdpError::ElementNotFound(format!(
                    "{} (waited {}ms)",
                    locator,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Whether the locator currently matches a visible element. Never waits.
    pub async fn is_visible(&self, locator: &Locator) -> bool {
        matches!(self.evaluate(&locator.visible_js()).await, Ok(Value::Bool(true)))
    }

    /// Wait for the element, then click its centre with the mouse.
    pub async fn click(&self, locator: &Locator, timeout: Duration) -> Result<(), CdpError> {
        self.wait_visible(locator, timeout).await?;
        let center = self.evaluate(&locator.center_js()).await?;
        let point: Point = serde_json::from_value(center)
            .map_err(|_| CdpError::ElementNotFound(locator.to_string()))?;
        self.click_at(point.x, point.y).await?;
        debug!(locator = %locator, "Clicked element");
        Ok(())
    }

    /// Click through `HTMLElement.click()`, for elements that are present but
    /// covered or zero-sized.
    pub async fn force_click(&self, locator: &Locator, timeout: Duration) -> Result<(), CdpError> {
        self.wait_for(locator, timeout).await?;
        match self.evaluate(&locator.js_click_js()).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(CdpError::ElementNotFound(locator.to_string())),
        }
    }

    /// Replace the value of an input as if typed.
    pub async fn fill(&self, locator: &Locator, text: &str, timeout: Duration) -> Result<(), CdpError> {
        self.wait_visible(locator, timeout).await?;
        match self.evaluate(&locator.focus_js()).await? {
            Value::Bool(true) => {}
            _ => return Err(CdpError::ElementNotFound(locator.to_string())),
        }
        self.insert_text(text).await
    }

    /// Ensure a checkbox ends up checked.
    pub async fn check(&self, locator: &Locator, timeout: Duration) -> Result<(), CdpError> {
        self.wait_for(locator, timeout).await?;
        if self.is_checked(locator).await? {
            return Ok(());
        }

        if self.is_visible(locator).await {
            self.click(locator, timeout).await?;
        } else {
            self.force_click(locator, timeout).await?;
        }

        if self.is_checked(locator).await? {
            Ok(())
        } else {
            Err(CdpError::JavaScript(format!("{} did not become checked", locator)))
        }
    }

    async fn is_checked(&self, locator: &Locator) -> Result<bool, CdpError> {
        Ok(matches!(
            self.evaluate(&locator.checked_js()).await?,
            Value::Bool(true)
        ))
    }

    /// Text content of the element, if present.
    pub async fn text_of(&self, locator: &Locator) -> Result<Option<String>, CdpError> {
        let value = self.evaluate(&locator.text_js()).await?;
        Ok(value.as_str().map(|s| s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_finder_quotes_selector() {
        let locator = Locator::css("#connect-wallet-button");
        assert_eq!(
            locator.finder(),
            r##"document.querySelector("#connect-wallet-button")"##
        );
    }

    #[test]
    fn test_nth_finder_indexes_all_matches() {
        let locator = Locator::nth(r#"input[type="password"]"#, 1);
        assert_eq!(
            locator.finder(),
            r#"(document.querySelectorAll("input[type=\"password\"]")[1] || null)"#
        );
    }

    #[test]
    fn test_text_is_escaped_as_js_literal() {
        let locator = Locator::button(r#"It's "done""#);
        assert!(locator.finder().contains(r#"const t = "It's \"done\"";"#));
    }

    #[test]
    fn test_actions_wrap_finder() {
        let locator = Locator::text("Transaction submitted");
        let js = locator.visible_js();
        assert!(js.starts_with("((el) => {"));
        assert!(js.ends_with(&format!("}})({})", locator.finder())));
    }

    #[test]
    fn test_display_reads_like_a_selector() {
        assert_eq!(Locator::button("Paste").to_string(), r#"button:has-text("Paste")"#);
        assert_eq!(
            Locator::text("I have an existing wallet").to_string(),
            "text=I have an existing wallet"
        );
        assert_eq!(Locator::nth("input", 0).to_string(), "input >> nth=0");
        assert_eq!(Locator::exact_text("Sepolia").to_string(), r#"text="Sepolia""#);
    }
}
