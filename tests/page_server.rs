//! Demo page routes, in-process and over a real socket.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tokio::net::TcpListener;
use tower::ServiceExt;

use serde_json::{json, Value};

use common::{
    eventually, settings, subscribed_bridge, FakeProvider, ACCOUNT, SECOND_ACCOUNT, TX_HASH,
};
use sdk_rust::DemoPageClient;
use wallet_demo::bridge::{PageView, WalletBridge};
use wallet_demo::config::{ProviderConfig, ServerConfig};
use wallet_demo::provider::{BrowserRelayProvider, RelayRequest, RelayResponse};
use wallet_demo::http::X_REQUEST_ID;
use wallet_demo::{HttpServer, Shutdown};

fn server_for(bridge: std::sync::Arc<WalletBridge>) -> HttpServer {
    HttpServer::new(&ServerConfig::default(), bridge)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_index_exposes_driver_contract() {
    let bridge = std::sync::Arc::new(WalletBridge::new(None, settings()));
    let router = server_for(bridge).router();

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    let html = body_text(response).await;
    assert!(html.contains(r#"id="connect-wallet-button""#));
    assert!(html.contains(r#"id="send-tx-button""#));
    assert!(html.contains("Current Network: Not connected"));
    assert!(!html.contains(r#"id="tx-status""#));
}

#[tokio::test]
async fn test_form_connect_redirects_and_shows_notice_once() {
    let bridge = std::sync::Arc::new(WalletBridge::new(None, settings()));
    let router = server_for(bridge).router();

    let response = router
        .clone()
        .oneshot(Request::post("/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let first = body_text(
        router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;
    assert!(first.contains("Wallet provider not detected!"));

    let second = body_text(
        router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;
    assert!(!second.contains("Wallet provider not detected!"));
}

#[tokio::test]
async fn test_api_send_returns_hash() {
    let provider = FakeProvider::with_accounts(vec![ACCOUNT]);
    let bridge = subscribed_bridge(provider);
    let router = server_for(bridge).router();

    let response = router
        .clone()
        .oneshot(Request::post("/api/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.account, Some(ACCOUNT.to_string()));

    let response = router
        .oneshot(Request::post("/api/send").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.tx_hash, Some(TX_HASH.to_string()));
}

#[tokio::test]
async fn test_api_switch_network_returns_new_chain() {
    let provider = FakeProvider::with_accounts(vec![ACCOUNT]);
    provider.chain_id.store(31_337, Ordering::SeqCst);
    let bridge = subscribed_bridge(provider);
    let router = server_for(bridge).router();

    let response = router
        .clone()
        .oneshot(Request::post("/api/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.chain_id, Some(31_337));

    let response = router
        .oneshot(Request::post("/api/switch-network").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.chain_id, Some(11_155_111));
    assert_eq!(
        view.network_line,
        "Current Network: sepolia (Chain ID: 11155111)"
    );
}

#[tokio::test]
async fn test_sdk_drives_page_over_http() {
    let provider = FakeProvider::with_accounts(vec![ACCOUNT]);
    let bridge = subscribed_bridge(provider.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = server_for(bridge.clone());
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = DemoPageClient::new(&format!("http://{}", addr));

    let health = client.health().await.unwrap();
    assert!(health.provider);
    assert!(health.subscribed);
    assert!(!health.relay_attached);

    let state = client.send_transaction().await.unwrap();
    assert_eq!(state.notices, vec!["Connect wallet first!"]);
    assert!(state.tx_hash.is_none());

    let state = client.connect().await.unwrap();
    assert!(state.is_connected());
    assert_eq!(state.connect_label, "Connected: 0xf39F...");

    let state = client.send_transaction().await.unwrap();
    assert_eq!(
        state.transaction_line,
        Some(format!("Transaction sent! Hash: {TX_HASH}"))
    );

    let state = client.state().await.unwrap();
    assert!(state.notices.is_empty());
    assert_eq!(state.tx_hash, Some(TX_HASH.to_string()));

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();

    // Shutdown tears the subscription down.
    assert!(!bridge.is_subscribed());
    assert!(provider.listeners.is_empty());
}

fn relayed_server() -> (BrowserRelayProvider, std::sync::Arc<WalletBridge>, axum::Router) {
    let config = ProviderConfig {
        relay_request_timeout_secs: 5,
        relay_poll_secs: 1,
        ..ProviderConfig::default()
    };
    let relay = BrowserRelayProvider::new(&config, &[]);
    let bridge = std::sync::Arc::new(WalletBridge::new(
        Some(std::sync::Arc::new(relay.clone())),
        settings(),
    ));
    assert!(bridge.subscribe());
    let router =
        HttpServer::with_relay(&ServerConfig::default(), bridge.clone(), Some(relay.clone()))
            .router();
    (relay, bridge, router)
}

fn json_post(path: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Play the page's script: pull wallet requests and answer them like an
/// unlocked extension on Sepolia would.
fn wallet_page(router: axum::Router) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let response = router
                .clone()
                .oneshot(Request::get("/relay/next").body(Body::empty()).unwrap())
                .await
                .unwrap();
            if response.status() == StatusCode::NO_CONTENT {
                continue;
            }
            let request: RelayRequest = serde_json::from_str(&body_text(response).await).unwrap();
            let result = match request.method.as_str() {
                "eth_requestAccounts" | "eth_accounts" => json!([ACCOUNT]),
                "eth_chainId" => json!("0xaa36a7"),
                "eth_sendTransaction" => json!(TX_HASH),
                _ => Value::Null,
            };
            let reply = RelayResponse {
                id: request.id,
                result: Some(result),
                error: None,
            };
            router
                .clone()
                .oneshot(json_post("/relay/result", &reply))
                .await
                .unwrap();
        }
    })
}

#[tokio::test]
async fn test_page_wallet_answers_connect_and_send() {
    let (relay, _bridge, router) = relayed_server();

    let html = body_text(
        router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("fetch('/relay/next')"));

    let page = wallet_page(router.clone());
    assert!(eventually(|| relay.is_attached()).await);

    let response = router
        .clone()
        .oneshot(Request::post("/api/connect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.account, Some(ACCOUNT.to_string()));
    assert_eq!(view.chain_id, Some(11_155_111));

    let response = router
        .oneshot(Request::post("/api/send").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let view: PageView = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(view.tx_hash, Some(TX_HASH.to_string()));

    page.abort();
}

#[tokio::test]
async fn test_page_events_update_the_bridge() {
    let (_relay, bridge, router) = relayed_server();

    let response = router
        .oneshot(json_post(
            "/relay/event",
            &json!({"event": "accountsChanged", "data": [SECOND_ACCOUNT]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(eventually(|| bridge.account() == Some(SECOND_ACCOUNT)).await);
}

#[tokio::test]
async fn test_stale_relay_result_is_gone() {
    let (_relay, _bridge, router) = relayed_server();
    let reply = RelayResponse {
        id: 42,
        result: Some(Value::Null),
        error: None,
    };
    let response = router.oneshot(json_post("/relay/result", &reply)).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
}

#[tokio::test]
async fn test_relay_routes_absent_in_server_mode() {
    let bridge = std::sync::Arc::new(WalletBridge::new(None, settings()));
    let router = server_for(bridge).router();

    let response = router
        .oneshot(Request::get("/relay/next").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
