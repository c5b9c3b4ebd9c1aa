// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/agents*` handlers (spec §6). Agent CRUD goes straight through
//! `AppStore.agents`; start/stop/log defer to the [`SupervisorRegistry`]
//! running instance.

use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{OrkaError, OrkaResult};
use crate::orchestrator::new_uuid;
use crate::store::AgentConfig;

use super::AppState;

pub async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.agents.list().await)
}

/// Create or replace an agent config. An absent `id` mints a new one;
/// a present `id` updates the existing entry in place (spec §6 "upsert").
pub async fn upsert_agent(
    State(state): State<Arc<AppState>>,
    Json(mut body): Json<AgentConfig>,
) -> OrkaResult<Json<AgentConfig>> {
    if body.id.is_empty() {
        body.id = new_uuid();
    }
    state.store.agents.upsert(body.clone()).await.map_err(OrkaError::External)?;
    Ok(Json(body))
}

pub async fn remove_agent(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> OrkaResult<impl IntoResponse> {
    state.supervisor.stop_agent(&id).await;
    let removed = state.store.agents.remove(&id).await.map_err(OrkaError::External)?;
    if !removed {
        return Err(OrkaError::NotFound(format!("agent {id}")));
    }
    Ok(Json(serde_json::json!({ "removed": true })))
}

pub async fn start_agent(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> OrkaResult<impl IntoResponse> {
    let agent = state.store.agents.get(&id).await.ok_or_else(|| OrkaError::NotFound(format!("agent {id}")))?;
    state.supervisor.start_agent(agent).await?;
    Ok(Json(serde_json::json!({ "running": true })))
}

pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> OrkaResult<impl IntoResponse> {
    state.supervisor.stop_agent(&id).await;
    Ok(Json(serde_json::json!({ "running": false })))
}

pub async fn decision_log(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> OrkaResult<impl IntoResponse> {
    let log = state.supervisor.decision_log(&id).await?;
    Ok(Json(log))
}
