// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C2: lifecycle of sessions, their main branch, and arbitrary trees of
//! forks materialized as multiplexer panes. Every public method takes
//! `(project_root, ids…)` and returns the updated entity or an
//! `OrkaError`.

pub mod bridge;
pub mod export_merge;
pub mod fork;
pub mod prompts;
pub mod recovery;
pub mod session;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use orka_mux::{Multiplexer, PaneId, PaneLocks};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{OrkaError, OrkaResult};
use crate::store::{AppStore, ProjectStore};

/// Tunables the orchestrator needs beyond what `store`/`mux` already own.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub assistant_bin: String,
    pub bridge_bin: String,
    pub bridge_base_port: u16,
    pub host: String,
    pub auto_merge_wait: Duration,
    pub capture_lines: u32,
    /// How long to wait after creating a multiplexer session for the
    /// shell prompt to settle before launching the assistant.
    pub shell_settle: Duration,
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            assistant_bin: "assistant".to_owned(),
            bridge_bin: "orka-bridge".to_owned(),
            bridge_base_port: config.bridge_base_port,
            host: config.host.clone(),
            auto_merge_wait: config.auto_merge_wait(),
            capture_lines: config.capture_lines,
            shell_settle: Duration::from_millis(300),
        }
    }
}

pub struct Orchestrator {
    pub(crate) store: Arc<AppStore>,
    pub(crate) mux: Arc<dyn Multiplexer>,
    pub(crate) pane_locks: Arc<PaneLocks>,
    pub(crate) config: OrchestratorConfig,
    /// Cancellation tokens for in-flight `auto_merge_fork` waits, keyed by
    /// `"{session_id}:{fork_id}"` — closing a session cancels every wait
    /// still pending for it (spec §5 "closing a session cancels any
    /// pending export/merge wait").
    pending_merge_waits: Mutex<HashMap<String, CancellationToken>>,
}

impl Orchestrator {
    pub fn new(store: Arc<AppStore>, mux: Arc<dyn Multiplexer>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            mux,
            pane_locks: Arc::new(PaneLocks::new()),
            config,
            pending_merge_waits: Mutex::new(HashMap::new()),
        }
    }

    /// Register a cancellation token for a pending auto-merge wait on
    /// `session_id`/`fork_id`, replacing any stale token left from a prior
    /// wait on the same fork.
    pub(crate) async fn register_merge_wait(&self, session_id: &str, fork_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.pending_merge_waits
            .lock()
            .await
            .insert(format!("{session_id}:{fork_id}"), token.clone());
        token
    }

    /// Remove the token for `session_id`/`fork_id` once its wait has
    /// finished (normally or by cancellation).
    pub(crate) async fn clear_merge_wait(&self, session_id: &str, fork_id: &str) {
        self.pending_merge_waits.lock().await.remove(&format!("{session_id}:{fork_id}"));
    }

    /// Cancel every pending auto-merge wait belonging to `session_id`.
    pub(crate) async fn cancel_merge_waits(&self, session_id: &str) {
        let prefix = format!("{session_id}:");
        let waits = self.pending_merge_waits.lock().await;
        for (key, token) in waits.iter() {
            if key.starts_with(&prefix) {
                token.cancel();
            }
        }
    }

    pub(crate) async fn project_store(&self, root: &Path) -> Arc<ProjectStore> {
        self.store.project(root).await
    }

    /// Send a full line of text into a pane, as one indivisible delivery
    /// (pane-level lock held for the keys+enter pair, per spec §5).
    pub(crate) async fn send_line(&self, pane: &PaneId, text: &str) -> OrkaResult<()> {
        let _guard = self.pane_locks.acquire(pane).await;
        self.mux.send_keys(pane, text).await.map_err(mux_err)?;
        self.mux.send_enter(pane).await.map_err(mux_err)?;
        Ok(())
    }

    /// Send a bare Escape keystroke with no trailing Enter — used by the
    /// supervisor to back out of a prompt without submitting a line.
    pub(crate) async fn send_escape(&self, pane: &PaneId) -> OrkaResult<()> {
        let _guard = self.pane_locks.acquire(pane).await;
        self.mux.send_keys(pane, "\u{1b}").await.map_err(mux_err)?;
        Ok(())
    }

    pub async fn select_branch(
        &self,
        project_root: &Path,
        session_id: &str,
        branch_id: &str,
    ) -> OrkaResult<()> {
        let store = self.project_store(project_root).await;
        let session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        let pane = if branch_id == crate::store::MAIN_BRANCH_ID {
            session.main.pane_id.clone()
        } else {
            session.find_fork(branch_id).and_then(|f| f.pane_id.clone())
        };
        let pane = pane.ok_or_else(|| OrkaError::Precondition(format!("branch {branch_id} has no pane")))?;
        self.mux.select_pane(&PaneId::from(pane)).await.map_err(mux_err)?;
        Ok(())
    }

    pub async fn active_branch(&self, project_root: &Path, session_id: &str) -> OrkaResult<String> {
        let store = self.project_store(project_root).await;
        let session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        let active_pane = self.mux.get_active_pane(&session.mux_session_name).await.map_err(mux_err)?;
        if session.main.pane_id.as_deref() == Some(active_pane.0.as_str()) {
            return Ok(crate::store::MAIN_BRANCH_ID.to_owned());
        }
        for fork in &session.forks {
            if fork.pane_id.as_deref() == Some(active_pane.0.as_str()) {
                return Ok(fork.id.clone());
            }
        }
        Ok(crate::store::MAIN_BRANCH_ID.to_owned())
    }
}

pub(crate) fn mux_err(e: orka_mux::MuxError) -> OrkaError {
    if e.is_fatal() {
        OrkaError::FatalStartup(e.to_string())
    } else {
        OrkaError::External(anyhow::anyhow!(e))
    }
}

pub(crate) fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    crate::event::epoch_to_rfc3339(secs)
}

/// `assistant new --session-id <id>` — fixes the assistant-session id
/// before the process starts, so there is never a race between process
/// start and session-id detection (spec §4.3).
pub(crate) fn launch_new_command(bin: &str, session_id: &str) -> String {
    format!("{bin} new --session-id {session_id}")
}

/// `assistant resume <id>` — used both for "continue from" on session
/// creation and for re-attaching an existing branch on resume.
pub(crate) fn launch_resume_command(bin: &str, assistant_session_id: &str) -> String {
    format!("{bin} resume {assistant_session_id}")
}

/// `assistant resume <parent> fork-session --session-id <child>` —
/// pre-assigns the child id so no history-file polling is needed.
pub(crate) fn launch_fork_command(bin: &str, parent_assistant_session_id: &str, child_assistant_session_id: &str) -> String {
    format!("{bin} resume {parent_assistant_session_id} fork-session --session-id {child_assistant_session_id}")
}
