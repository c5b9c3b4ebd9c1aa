// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token middleware for the control surface. Grounded on the
//! teacher's `transport::auth` (`constant_time_eq`, `validate_bearer`,
//! path allow-list) — the hook receiver runs on its own port and never
//! passes through this layer at all, so it needs no mention here.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::state::AppState;

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else { return true };
    let Some(header) = headers.get("authorization").and_then(|v| v.to_str().ok()) else { return false };
    let Some(token) = header.strip_prefix("Bearer ") else { return false };
    constant_time_eq(token, expected)
}

#[derive(Serialize)]
struct Unauthorized {
    error: &'static str,
}

/// Enforces Bearer auth on every route except `/healthz` and the two
/// WebSocket upgrades, which authenticate via query token instead (same
/// split as the teacher's `auth_layer`).
pub async fn auth_layer(State(state): State<Arc<AppState>>, req: Request<axum::body::Body>, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/healthz" || path.starts_with("/ws/") {
        return next.run(req).await;
    }
    if validate_bearer(req.headers(), state.auth_token.as_deref()) {
        return next.run(req).await;
    }
    (StatusCode::UNAUTHORIZED, Json(Unauthorized { error: "unauthorized" })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn no_token_configured_allows_everything() {
        let headers = HeaderMap::new();
        assert!(validate_bearer(&headers, None));
    }

    #[test]
    fn rejects_missing_header_when_token_configured() {
        let headers = HeaderMap::new();
        assert!(!validate_bearer(&headers, Some("secret")));
    }

    #[test]
    fn accepts_matching_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        assert!(validate_bearer(&headers, Some("secret")));
    }

    #[test]
    fn rejects_mismatched_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer wrong"));
        assert!(!validate_bearer(&headers, Some("secret")));
    }
}
