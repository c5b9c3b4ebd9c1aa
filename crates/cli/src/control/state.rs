// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state threaded through every control-surface handler via axum's
//! `State` extractor, mirroring the teacher's `transport::state::AppState`
//! sub-struct organization.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::orchestrator::Orchestrator;
use crate::store::AppStore;
use crate::supervisor::SupervisorRegistry;

pub struct AppState {
    pub store: Arc<AppStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub supervisor: Arc<SupervisorRegistry>,
    pub auth_token: Option<String>,
    pub shutdown: CancellationToken,
}
