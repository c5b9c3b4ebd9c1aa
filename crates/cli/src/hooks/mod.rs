// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3: the hook receiver. A small `axum` router living on its own port
//! (`--hook-port`, distinct from the control surface's `--port`), with a
//! single `POST /hooks/:agent_id` route. Normalization exactly as spec
//! §4.4: parse as JSON, fall back to the raw-text `Stop` envelope on parse
//! failure, fill in a missing timestamp, stamp with routing metadata, and
//! push onto the agent's inbound queue.
//!
//! Grounded on the teacher's `transport::http::hooks` (`hooks_stop`/
//! `hooks_start`) for the "parse best-effort, always answer fast" shape —
//! adapted here from a hard-coded stop/start pair to the open
//! `HookEventKind` tagged enum (spec §9).

use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::event::{RawHookEvent, StampedHookEvent};
use crate::store::AppStore;
use crate::supervisor::SupervisorRegistry;

/// Request bodies larger than this are rejected with `413` before JSON
/// parsing is attempted — cheap hardening against a misbehaving hook
/// script, since hook payloads are untrusted local input (spec SPEC_FULL.md
/// ambient note).
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct HookState {
    pub store: Arc<AppStore>,
    pub supervisor: Arc<SupervisorRegistry>,
}

#[derive(Serialize)]
struct ReceiptBody {
    accepted: bool,
}

/// Build the hook-receiver router. Mounted on its own listener in
/// `run::run`, never behind the control surface's Bearer-auth middleware.
pub fn build_hook_router(state: HookState) -> Router {
    Router::new().route("/hooks/{agent_id}", post(receive_hook)).with_state(Arc::new(state))
}

async fn receive_hook(
    State(state): State<Arc<HookState>>,
    AxumPath(agent_id): AxumPath<String>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    if body.len() > MAX_BODY_BYTES {
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(serde_json::json!({ "error": "body too large" })))
            .into_response();
    }

    // 1. Parse as JSON; on parse failure wrap the raw text as a
    //    synthetic `Stop` event carrying the original bytes.
    let raw = match serde_json::from_slice::<RawHookEvent>(&body) {
        Ok(event) => event,
        Err(_) => RawHookEvent::from_raw_text(&String::from_utf8_lossy(&body)),
    };
    // 2. Fill in a missing timestamp.
    let raw = raw.with_timestamp_filled();

    // 3. Look up the agent; 404 if unknown.
    let Some(agent) = state.store.agents.get(&agent_id).await else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "unknown agent" }))).into_response();
    };

    // 4. Stamp with routing metadata and push onto the inbound queue.
    let stamped = StampedHookEvent {
        agent_id: agent_id.clone(),
        project_path: agent.project_path.clone(),
        orka_session_id: agent.session_id.clone(),
        raw,
    };

    if let Err(err) = state.supervisor.dispatch(&agent_id, stamped).await {
        warn!(agent_id, %err, "failed to dispatch hook event (agent not running)");
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "agent not running" }))).into_response();
    }

    (StatusCode::ACCEPTED, Json(ReceiptBody { accepted: true })).into_response()
}
