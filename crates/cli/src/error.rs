// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified error type shared by the orchestrator, store, and control
//! surface. Each variant maps to exactly one HTTP status, mirroring the
//! category table in the design notes (`NotFound` → 404, `Precondition` →
//! 409, `External` → 502, ...).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum OrkaError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("external dependency failed: {0}")]
    External(#[from] anyhow::Error),

    #[error("state corrupted: {0}")]
    CorruptedState(String),

    #[error("cancelled")]
    Cancellation,

    #[error("fatal startup error: {0}")]
    FatalStartup(String),
}

impl OrkaError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Precondition(_) => StatusCode::CONFLICT,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::CorruptedState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancellation => StatusCode::OK,
            Self::FatalStartup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Precondition(_) => "PRECONDITION",
            Self::External(_) => "EXTERNAL",
            Self::CorruptedState(_) => "CORRUPTED_STATE",
            Self::Cancellation => "CANCELLED",
            Self::FatalStartup(_) => "FATAL_STARTUP",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: Option<String>,
}

impl IntoResponse for OrkaError {
    fn into_response(self) -> Response {
        // Cancellation is user-invisible: empty 200 body, per design notes.
        if matches!(self, Self::Cancellation) {
            return StatusCode::OK.into_response();
        }
        let status = self.status();
        let body = ErrorBody { error: self.code(), detail: Some(self.to_string()) };
        (status, Json(body)).into_response()
    }
}

pub type OrkaResult<T> = Result<T, OrkaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_design() {
        assert_eq!(OrkaError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(OrkaError::Precondition("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            OrkaError::External(anyhow::anyhow!("boom")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(OrkaError::Cancellation.status(), StatusCode::OK);
    }
}
