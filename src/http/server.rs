//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the page, form actions, JSON API and wallet relay
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve until the shutdown signal, then tear down the bridge

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bridge::WalletBridge;
use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::request::RequestIdMaker;
use crate::lifecycle::Shutdown;
use crate::provider::BrowserRelayProvider;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<WalletBridge>,
    /// Present when the bridge's provider is the page's own wallet.
    pub relay: Option<BrowserRelayProvider>,
}

/// HTTP server for the demo page.
pub struct HttpServer {
    router: Router,
    bridge: Arc<WalletBridge>,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, bridge: Arc<WalletBridge>) -> Self {
        Self::with_relay(config, bridge, None)
    }

    /// Serve the page with the `/relay/*` routes that let its script carry
    /// wallet requests to `window.ethereum`.
    pub fn with_relay(
        config: &ServerConfig,
        bridge: Arc<WalletBridge>,
        relay: Option<BrowserRelayProvider>,
    ) -> Self {
        let state = AppState {
            bridge: bridge.clone(),
            relay,
        };
        let router = Self::build_router(config, state);
        Self { router, bridge }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/connect", post(handlers::connect))
            .route("/send", post(handlers::send))
            .route("/switch-network", post(handlers::switch_network))
            .route("/api/state", get(handlers::api_state))
            .route("/api/connect", post(handlers::api_connect))
            .route("/api/send", post(handlers::api_send))
            .route("/api/switch-network", post(handlers::api_switch_network))
            .route("/relay/next", get(handlers::relay_next))
            .route("/relay/result", post(handlers::relay_result))
            .route("/relay/event", post(handlers::relay_event))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(RequestIdMaker))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Demo page listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        self.bridge.teardown();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
