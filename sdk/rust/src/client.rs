use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The demo page state as served by `/api/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub connect_label: String,
    pub network_line: String,
    pub transaction_line: Option<String>,
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    pub tx_hash: Option<String>,
    pub notices: Vec<String>,
}

impl PageState {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub version: String,
    pub status: String,
    pub provider: bool,
    pub subscribed: bool,
    #[serde(default)]
    pub relay_attached: bool,
}

pub struct DemoPageClient {
    client: Client,
    base_url: String,
}

impl DemoPageClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current page state without triggering anything.
    pub async fn state(&self) -> Result<PageState, Box<dyn std::error::Error>> {
        self.get("/api/state").await
    }

    /// Press the connect button.
    pub async fn connect(&self) -> Result<PageState, Box<dyn std::error::Error>> {
        self.post("/api/connect").await
    }

    /// Press the send button.
    pub async fn send_transaction(&self) -> Result<PageState, Box<dyn std::error::Error>> {
        self.post("/api/send").await
    }

    /// Ask the wallet to switch to the page's target network.
    pub async fn switch_network(&self) -> Result<PageState, Box<dyn std::error::Error>> {
        self.post("/api/switch-network").await
    }

    pub async fn health(&self) -> Result<Health, Box<dyn std::error::Error>> {
        self.get("/health").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, Box<dyn std::error::Error>> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Demo page returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<T>(&text)?)
    }
}
