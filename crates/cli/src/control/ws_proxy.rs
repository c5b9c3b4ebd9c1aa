// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/terminal?session=:id&project=:enc` — **[SUPPLEMENT]** terminal
//! relay proxy. The control surface never terminates the terminal itself:
//! it connects out to the session's stored bridge port with
//! `tokio-tungstenite` and pipes frames bidirectionally between that
//! upstream socket and the inbound browser socket. Closing either side
//! never kills the underlying multiplexer session or bridge process —
//! grounded on the teacher's `ws_mux` fan-out pattern (subscribe, forward,
//! never terminate the underlying resource on disconnect).

use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tracing::warn;

use super::auth::validate_bearer;
use super::{decode_project_path, AppState};

#[derive(Debug, Deserialize)]
pub struct TerminalQuery {
    pub project: String,
    pub session: String,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn ws_terminal(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TerminalQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if let Some(expected) = state.auth_token.as_deref() {
        let mut headers = axum::http::HeaderMap::new();
        if let Some(token) = &query.token {
            if let Ok(value) = axum::http::HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert("authorization", value);
            }
        }
        if !validate_bearer(&headers, Some(expected)) {
            return axum::http::StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let Some(project_path) = decode_project_path(&query.project) else {
        return axum::http::StatusCode::BAD_REQUEST.into_response();
    };

    let project_store = state.store.project(Path::new(&project_path)).await;
    let Some(session) = project_store.get_session(&query.session).await else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };
    let Some(bridge) = session.bridge else {
        return (axum::http::StatusCode::SERVICE_UNAVAILABLE, "no bridge running for this session").into_response();
    };

    ws.on_upgrade(move |socket| proxy(socket, bridge.port)).into_response()
}

/// Connect to the bridge's WebSocket endpoint and pipe frames both ways
/// until either side closes. Every failure here is logged and swallowed —
/// the browser simply sees its socket close.
async fn proxy(client: WebSocket, bridge_port: u16) {
    let upstream_url = format!("ws://127.0.0.1:{bridge_port}/");
    let (upstream, _) = match tokio_tungstenite::connect_async(&upstream_url).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(bridge_port, %err, "failed to connect to web-terminal bridge");
            return;
        }
    };

    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let forwarded = match msg {
                AxumMessage::Text(text) => TungsteniteMessage::Text(text.to_string().into()),
                AxumMessage::Binary(data) => TungsteniteMessage::Binary(data),
                AxumMessage::Close(_) => break,
                AxumMessage::Ping(data) => TungsteniteMessage::Ping(data),
                AxumMessage::Pong(data) => TungsteniteMessage::Pong(data),
            };
            if upstream_tx.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let forwarded = match msg {
                TungsteniteMessage::Text(text) => AxumMessage::Text(text.to_string().into()),
                TungsteniteMessage::Binary(data) => AxumMessage::Binary(data),
                TungsteniteMessage::Close(_) => break,
                TungsteniteMessage::Ping(data) => AxumMessage::Ping(data),
                TungsteniteMessage::Pong(data) => AxumMessage::Pong(data),
                TungsteniteMessage::Frame(_) => continue,
            };
            if client_tx.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}
