// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-scope routes (spec §1: "the embedded file browser, code
//! editor, git panel, and image/transcription routes"). Rather than
//! omitting them, each is routed to a typed `501 Not Implemented` stub so
//! the surface remains a complete REST contract a real front end can
//! probe against — the ambient *shape* of the surface is carried even
//! where the feature itself is explicitly out of scope.

use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Serialize)]
struct NotImplementedBody {
    error: &'static str,
    detail: &'static str,
}

fn not_implemented(detail: &'static str) -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, Json(NotImplementedBody { error: "NOT_IMPLEMENTED", detail }))
}

async fn file_browser() -> impl IntoResponse {
    not_implemented("file browser is out of scope of the core orchestrator")
}

async fn editor() -> impl IntoResponse {
    not_implemented("code editor is out of scope of the core orchestrator")
}

async fn git_panel() -> impl IntoResponse {
    not_implemented("git panel is out of scope of the core orchestrator")
}

async fn image_route() -> impl IntoResponse {
    not_implemented("image upload/serving is out of scope of the core orchestrator")
}

async fn transcription() -> impl IntoResponse {
    not_implemented("voice transcription is out of scope of the core orchestrator")
}

pub fn router() -> axum::Router<std::sync::Arc<super::AppState>> {
    axum::Router::new()
        .route("/api/files/{*path}", any(file_browser))
        .route("/api/editor/{*path}", any(editor))
        .route("/api/git/{*path}", any(git_panel))
        .route("/api/images", post(image_route))
        .route("/api/images/{*path}", get(image_route))
        .route("/api/transcribe", post(transcription))
}
