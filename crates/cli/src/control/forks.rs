// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/sessions/{id}/forks*` handlers (spec §6).

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::OrkaResult;
use crate::store::model::Fork;

use super::sessions::ProjectQuery;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateForkBody {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vertical: bool,
}

pub async fn create_fork(
    State(state): State<Arc<AppState>>,
    AxumPath(session_id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<CreateForkBody>,
) -> OrkaResult<Json<Fork>> {
    let project = query.resolve()?;
    let fork = state
        .orchestrator
        .create_fork(Path::new(&project), &session_id, body.parent_id, body.name, body.vertical)
        .await?;
    Ok(Json(fork))
}

pub async fn export_fork(
    State(state): State<Arc<AppState>>,
    AxumPath((session_id, fork_id)): AxumPath<(String, String)>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    let summary = state.orchestrator.export_fork(Path::new(&project), &session_id, &fork_id).await?;
    Ok(Json(serde_json::json!({ "summary": summary })))
}

#[derive(Debug, Deserialize, Default)]
pub struct MergeForkQuery {
    #[serde(default)]
    pub auto: bool,
}

pub async fn merge_fork(
    State(state): State<Arc<AppState>>,
    AxumPath((session_id, fork_id)): AxumPath<(String, String)>,
    Query(query): Query<ProjectQuery>,
    Query(merge_query): Query<MergeForkQuery>,
) -> OrkaResult<Json<Fork>> {
    let project = query.resolve()?;
    let fork = if merge_query.auto {
        state.orchestrator.auto_merge_fork(Path::new(&project), &session_id, &fork_id).await?
    } else {
        state.orchestrator.merge_fork(Path::new(&project), &session_id, &fork_id).await?
    };
    Ok(Json(fork))
}

pub async fn delete_fork(
    State(state): State<Arc<AppState>>,
    AxumPath((session_id, fork_id)): AxumPath<(String, String)>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    state.orchestrator.delete_fork(Path::new(&project), &session_id, &fork_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
