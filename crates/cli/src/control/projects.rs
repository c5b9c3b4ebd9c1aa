// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET/POST /api/projects`, `DELETE /api/projects/:enc` (spec §6).

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{OrkaError, OrkaResult};

use super::{decode_project_path, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProjectBody {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub path: String,
    pub name: String,
    pub session_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened: Option<String>,
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> OrkaResult<impl IntoResponse> {
    let entries = state.store.registry.list().await;
    let mut summaries = Vec::with_capacity(entries.len());
    for entry in entries {
        let project_store = state.store.project(Path::new(&entry.path)).await;
        let session_count = project_store.list_sessions(false).await.len();
        summaries.push(ProjectSummary {
            path: entry.path,
            name: entry.name,
            session_count,
            last_opened: entry.last_opened,
        });
    }
    Ok(Json(summaries))
}

pub async fn register_project(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterProjectBody>,
) -> OrkaResult<impl IntoResponse> {
    let name = body.name.unwrap_or_else(|| {
        Path::new(&body.path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| body.path.clone())
    });
    let entry = state.store.registry.register(&body.path, &name).await.map_err(OrkaError::External)?;
    let _ = state.store.project(Path::new(&body.path)).await;
    Ok(Json(entry))
}

pub async fn deregister_project(
    State(state): State<Arc<AppState>>,
    AxumPath(enc): AxumPath<String>,
) -> OrkaResult<impl IntoResponse> {
    let path = decode_project_path(&enc).ok_or_else(|| OrkaError::Precondition("invalid project encoding".into()))?;
    let removed = state.store.registry.deregister(&path).await.map_err(OrkaError::External)?;
    if !removed {
        return Err(OrkaError::NotFound(format!("project {path}")));
    }
    Ok(Json(serde_json::json!({ "removed": true })))
}
