// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5: the control-plane HTTP/WebSocket surface (spec §4.6, §6 "HTTP
//! surface"). Router construction grounded on the teacher's
//! `transport::http` module-per-concern layout, one file per resource,
//! each re-exported here and mounted onto a single `axum::Router`.

pub mod agents;
pub mod auth;
pub mod events;
pub mod forks;
pub mod projects;
pub mod sessions;
pub mod state;
pub mod stubs;
pub mod ws_proxy;

use std::sync::Arc;

use axum::extract::State;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn healthz() -> impl IntoResponse {
    Json(HealthBody { status: "ok" })
}

/// `GET /api/v1/shutdown` — cancel the process-wide root token, per spec
/// §5 "5s grace period" (the actual wait happens in `run::run`'s shutdown
/// sequence, not here; this only signals intent).
async fn shutdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.shutdown.cancel();
    Json(HealthBody { status: "shutting_down" })
}

/// Build the full control-surface router, Bearer-auth middleware applied
/// to every route except `/healthz` and the `/ws/*` upgrades.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/shutdown", post(shutdown))
        .route("/api/projects", get(projects::list_projects).post(projects::register_project))
        .route("/api/projects/{enc}", delete(projects::deregister_project))
        .route("/api/sessions", get(sessions::list_sessions).post(sessions::create_session))
        .route("/api/sessions/{id}/resume", post(sessions::resume_session))
        .route("/api/sessions/{id}/close", post(sessions::close_session))
        .route("/api/sessions/{id}", delete(sessions::delete_session))
        .route("/api/sessions/{id}/forks", post(forks::create_fork))
        .route("/api/sessions/{id}/forks/{fork_id}/export", post(forks::export_fork))
        .route("/api/sessions/{id}/forks/{fork_id}/merge", post(forks::merge_fork))
        .route("/api/sessions/{id}/forks/{fork_id}", delete(forks::delete_fork))
        .route("/api/sessions/{id}/select-branch", post(sessions::select_branch))
        .route("/api/sessions/{id}/active-branch", get(sessions::active_branch))
        .route("/api/agents", get(agents::list_agents).post(agents::upsert_agent))
        .route("/api/agents/{id}", delete(agents::remove_agent))
        .route("/api/agents/{id}/start", post(agents::start_agent))
        .route("/api/agents/{id}/stop", post(agents::stop_agent))
        .route("/api/agents/{id}/log", get(agents::decision_log))
        .route("/ws/terminal", get(ws_proxy::ws_terminal))
        .route("/ws/state", get(events::ws_state))
        .merge(stubs::router())
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Base64 (URL-safe, unpadded) project-path codec shared by every handler
/// that takes a `:enc` path segment.
pub fn encode_project_path(path: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD.encode(path.as_bytes())
}

pub fn decode_project_path(enc: &str) -> Option<String> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    let bytes = URL_SAFE_NO_PAD.decode(enc).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_path_round_trips() {
        let enc = encode_project_path("/home/user/my project");
        assert_eq!(decode_project_path(&enc).as_deref(), Some("/home/user/my project"));
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert!(decode_project_path("not valid base64!!").is_none());
    }
}
