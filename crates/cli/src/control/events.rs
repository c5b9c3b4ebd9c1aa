// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/state?project=:enc` — **[SUPPLEMENT]** state-update push.
//! Subscribes to the project's `broadcast::Sender<StateDelta>` (emitted by
//! `ProjectStore::with_write` on every successful mutation) and re-emits
//! each delta as a JSON text frame. Grounded on the teacher's
//! `state_tx`/`output_tx` broadcast-channel convention in
//! `transport::state::Store` and its `ws_mux` fan-out loop.

use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast;

use super::auth::validate_bearer;
use super::{decode_project_path, AppState};

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub project: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /ws/state?project=:enc` — this route is exempt from the Bearer
/// middleware (it never sees an `Authorization` header from a browser's
/// native WebSocket client), so it authenticates via the `token` query
/// parameter instead, same split as `ws_proxy`.
pub async fn ws_state(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StateQuery>,
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
    let rx = project_store.subscribe();
    ws.on_upgrade(move |socket| relay(socket, rx)).into_response()
}

async fn relay(mut socket: WebSocket, mut rx: broadcast::Receiver<crate::store::StateDelta>) {
    loop {
        tokio::select! {
            delta = rx.recv() => {
                let delta = match delta {
                    Ok(d) => d,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Ok(json) = serde_json::to_string(&delta) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}
