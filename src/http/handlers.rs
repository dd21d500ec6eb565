//! Page and API handlers.
//!
//! Form posts run a bridge operation and redirect back to the page; the
//! `/api` variants return the resulting [`PageView`] as JSON. The `/relay`
//! routes carry wallet requests between the bridge and the page's script.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::bridge::PageView;
use crate::http::page;
use crate::http::server::AppState;
use crate::provider::{RelayNotification, RelayResponse};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render(&state.bridge.view(), state.relay.is_some()))
}

pub async fn connect(State(state): State<AppState>) -> Redirect {
    state.bridge.connect().await;
    Redirect::to("/")
}

pub async fn send(State(state): State<AppState>) -> Redirect {
    state.bridge.send_test_transaction().await;
    Redirect::to("/")
}

pub async fn switch_network(State(state): State<AppState>) -> Redirect {
    state.bridge.switch_network().await;
    Redirect::to("/")
}

pub async fn api_state(State(state): State<AppState>) -> Json<PageView> {
    Json(state.bridge.view())
}

pub async fn api_connect(State(state): State<AppState>) -> Json<PageView> {
    state.bridge.connect().await;
    Json(state.bridge.view())
}

pub async fn api_send(State(state): State<AppState>) -> Json<PageView> {
    state.bridge.send_test_transaction().await;
    Json(state.bridge.view())
}

pub async fn api_switch_network(State(state): State<AppState>) -> Json<PageView> {
    state.bridge.switch_network().await;
    Json(state.bridge.view())
}

/// Long-poll: the next wallet request as JSON, or 204 when none arrived.
pub async fn relay_next(State(state): State<AppState>) -> Response {
    let Some(relay) = &state.relay else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match relay.next_request().await {
        Some(request) => Json(request).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// 204 once the waiting bridge call has its answer, 410 if it gave up.
pub async fn relay_result(
    State(state): State<AppState>,
    Json(response): Json<RelayResponse>,
) -> StatusCode {
    let Some(relay) = &state.relay else {
        return StatusCode::NOT_FOUND;
    };
    if relay.complete(response) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::GONE
    }
}

pub async fn relay_event(
    State(state): State<AppState>,
    Json(notification): Json<RelayNotification>,
) -> StatusCode {
    match &state.relay {
        Some(relay) => {
            relay.notify(notification);
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub provider: bool,
    pub subscribed: bool,
    /// A page is polling the wallet relay.
    pub relay_attached: bool,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        provider: state.bridge.has_provider(),
        subscribed: state.bridge.is_subscribed(),
        relay_attached: state.relay.as_ref().is_some_and(|r| r.is_attached()),
    })
}
