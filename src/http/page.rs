//! HTML rendering of the demo page.
//!
//! The element ids are a contract with the automation driver:
//! `connect-wallet-button`, `send-tx-button`, `switch-network-button`,
//! `network-status`, `tx-status`, `notices`.
//!
//! In browser mode the page also carries [`RELAY_SCRIPT`]: it answers the
//! bridge's wallet requests with `window.ethereum` and turns the forms into
//! `/api` calls, so the page stays loaded while the wallet prompts.

use crate::bridge::PageView;

pub const CONNECT_BUTTON_ID: &str = "connect-wallet-button";
pub const SEND_BUTTON_ID: &str = "send-tx-button";
pub const SWITCH_BUTTON_ID: &str = "switch-network-button";

/// Runs in the page when the bridge's provider is the browser wallet.
pub const RELAY_SCRIPT: &str = r#"(() => {
  const eth = window.ethereum;
  const post = (path, body) => fetch(path, {
    method: 'POST',
    headers: {'content-type': 'application/json'},
    body: JSON.stringify(body),
  });
  const pause = (ms) => new Promise((resolve) => setTimeout(resolve, ms));

  const showNotices = (notices) => {
    const old = document.getElementById('notices');
    if (old) old.remove();
    if (!notices.length) return;
    const box = document.createElement('div');
    box.id = 'notices';
    box.setAttribute('role', 'alert');
    for (const text of notices) {
      const p = document.createElement('p');
      p.className = 'notice';
      p.textContent = text;
      box.appendChild(p);
    }
    document.querySelector('h1').after(box);
  };

  const render = (view) => {
    document.getElementById('connect-wallet-button').textContent = view.connect_label;
    document.getElementById('network-status').textContent = view.network_line;
    showNotices(view.notices);
    if (view.transaction_line) {
      let status = document.getElementById('tx-status');
      if (!status) {
        status = document.createElement('p');
        status.id = 'tx-status';
        document.body.appendChild(status);
      }
      status.textContent = view.transaction_line;
    }
  };

  for (const form of document.querySelectorAll('form[data-action]')) {
    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      if (!eth) {
        showNotices(['Wallet provider not detected!']);
        return;
      }
      const response = await fetch('/api/' + form.dataset.action, {method: 'POST'});
      render(await response.json());
    });
  }

  if (!eth) return;
  eth.on('chainChanged', (data) => post('/relay/event', {event: 'chainChanged', data}));
  eth.on('accountsChanged', (data) => post('/relay/event', {event: 'accountsChanged', data}));

  (async () => {
    for (;;) {
      try {
        const response = await fetch('/relay/next');
        if (response.status === 204) continue;
        if (response.status !== 200) { await pause(1000); continue; }
        const request = await response.json();
        let reply;
        try {
          const result = await eth.request({method: request.method, params: request.params});
          reply = {id: request.id, result: result === undefined ? null : result};
        } catch (err) {
          reply = {id: request.id, error: {code: err.code || -32603, message: String(err.message || err)}};
        }
        await post('/relay/result', reply);
      } catch (_) {
        await pause(1000);
      }
    }
  })();
})();"#;

/// Render the full page for `view`, with the wallet relay script when
/// `relay` is set.
pub fn render(view: &PageView, relay: bool) -> String {
    let mut html = String::with_capacity(2048);
    html.push_str(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Minimal Wallet DApp</title>\n</head>\n<body style=\"padding: 20px\">\n\
         <h1>Minimal Wallet DApp</h1>\n",
    );

    if !view.notices.is_empty() {
        html.push_str("<div id=\"notices\" role=\"alert\">\n");
        for notice in &view.notices {
            html.push_str(&format!("<p class=\"notice\">{}</p>\n", escape(notice)));
        }
        html.push_str("</div>\n");
    }

    html.push_str(&format!(
        "<form method=\"post\" action=\"/connect\" data-action=\"connect\">\
         <button type=\"submit\" id=\"{CONNECT_BUTTON_ID}\">{}</button></form>\n",
        escape(&view.connect_label)
    ));
    html.push_str(&format!(
        "<p id=\"network-status\">{}</p>\n",
        escape(&view.network_line)
    ));
    html.push_str(&format!(
        "<form method=\"post\" action=\"/switch-network\" data-action=\"switch-network\">\
         <button type=\"submit\" id=\"{SWITCH_BUTTON_ID}\">Switch Network</button></form>\n"
    ));
    html.push_str(&format!(
        "<form method=\"post\" action=\"/send\" data-action=\"send\">\
         <button type=\"submit\" id=\"{SEND_BUTTON_ID}\">Send Test Transaction</button></form>\n"
    ));

    if let Some(hash) = &view.tx_hash {
        html.push_str(&format!(
            "<p id=\"tx-status\">Transaction sent! Hash: <code>{}</code></p>\n",
            escape(hash)
        ));
    }

    if relay {
        html.push_str("<script>\n");
        html.push_str(RELAY_SCRIPT);
        html.push_str("\n</script>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ConnectionState;

    #[test]
    fn test_page_contains_driver_contract() {
        let view = PageView::render(&ConnectionState::default(), None, &[]);
        let html = render(&view, false);
        assert!(html.contains("id=\"connect-wallet-button\">Connect Wallet</button>"));
        assert!(html.contains("id=\"send-tx-button\""));
        assert!(html.contains("<p id=\"network-status\">Current Network: Not connected</p>"));
        assert!(!html.contains("tx-status"));
        assert!(!html.contains("id=\"notices\""));
    }

    #[test]
    fn test_notices_are_escaped() {
        let mut view = PageView::render(&ConnectionState::default(), None, &[]);
        view.notices.push("<script>".to_string());
        let html = render(&view, false);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_relay_script_only_in_browser_mode() {
        let view = PageView::render(&ConnectionState::default(), None, &[]);
        let html = render(&view, true);
        assert!(html.contains("<script>"));
        assert!(html.contains("fetch('/relay/next')"));
        assert!(html.contains("data-action=\"send\""));
        assert!(!render(&view, false).contains("/relay/next"));
    }
}
