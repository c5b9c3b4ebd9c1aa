// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/sessions*` handlers (spec §6). Project-scoped reads/writes take
//! the project root as a base64-encoded `?project=:enc` query parameter,
//! except session creation, which carries the plain path in the body.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::{OrkaError, OrkaResult};
use crate::store::Session;

use super::{decode_project_path, AppState};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project: String,
}

impl ProjectQuery {
    pub(crate) fn resolve(&self) -> OrkaResult<String> {
        decode_project_path(&self.project).ok_or_else(|| OrkaError::Precondition("invalid project encoding".into()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub project: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub continue_from_assistant_session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectBranchBody {
    pub branch_id: String,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    let store = state.store.project(Path::new(&project)).await;
    Ok(Json(store.list_sessions(false).await))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionBody>,
) -> OrkaResult<Json<Session>> {
    let root = Path::new(&body.project);
    let session = state
        .orchestrator
        .create_session(root, body.name, body.continue_from_assistant_session)
        .await?;
    Ok(Json(session))
}

pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<Json<Session>> {
    let project = query.resolve()?;
    let session = state.orchestrator.resume_session(Path::new(&project), &id).await?;
    Ok(Json(session))
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<Json<Session>> {
    let project = query.resolve()?;
    let session = state.orchestrator.close_session(Path::new(&project), &id).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    state.orchestrator.delete_session(Path::new(&project), &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn select_branch(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<SelectBranchBody>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    state.orchestrator.select_branch(Path::new(&project), &id, &body.branch_id).await?;
    Ok(Json(serde_json::json!({ "selected": body.branch_id })))
}

pub async fn active_branch(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ProjectQuery>,
) -> OrkaResult<impl IntoResponse> {
    let project = query.resolve()?;
    let branch_id = state.orchestrator.active_branch(Path::new(&project), &id).await?;
    Ok(Json(serde_json::json!({ "branchId": branch_id })))
}
