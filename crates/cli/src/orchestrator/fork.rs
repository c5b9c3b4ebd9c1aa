// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fork lifecycle: create, close, delete. Enforces invariant 3 (at most
//! one active child per parent) at creation time, never after the fact.

use std::path::Path;

use orka_mux::PaneId;
use tracing::info;

use crate::error::{OrkaError, OrkaResult};
use crate::orchestrator::{launch_fork_command, mux_err, new_uuid, now_rfc3339, Orchestrator};
use crate::store::model::{Fork, ForkStatus, Session};
use crate::store::MAIN_BRANCH_ID;

impl Orchestrator {
    /// Create a fork off `parent_id` (default `"main"`).
    pub async fn create_fork(
        &self,
        project_root: &Path,
        session_id: &str,
        parent_id: Option<String>,
        name: Option<String>,
        vertical: bool,
    ) -> OrkaResult<Fork> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;

        if !session.is_active() {
            return Err(OrkaError::Precondition(format!("session {session_id} is not active")));
        }
        let parent_id = parent_id.unwrap_or_else(|| MAIN_BRANCH_ID.to_owned());
        let parent_pane = self.resolve_branch_pane(&session, &parent_id)?;
        let parent_assistant_session_id = session
            .resolve_assistant_session_id(&parent_id)
            .ok_or_else(|| OrkaError::NotFound(format!("branch {parent_id}")))?
            .to_owned();

        // Invariant 3: at most one active child fork per parent.
        if session.has_active_child(&parent_id) {
            return Err(OrkaError::Precondition(format!(
                "parent branch {parent_id} already has an active fork"
            )));
        }

        // Allocate both ids before touching the multiplexer — removes the
        // detection race entirely (spec §4.3 step 1).
        let fork_id = new_uuid();
        let fork_assistant_session_id = new_uuid();
        let fork_name = name.unwrap_or_else(|| format!("fork-{}", &fork_id[..8]));

        self.mux.select_pane(&parent_pane).await.map_err(mux_err)?;
        let fork_pane = self.mux.split_pane(&session.mux_session_name, vertical).await.map_err(mux_err)?;
        self.mux.set_pane_title(&fork_pane, &fork_name).await.map_err(mux_err)?;

        let cmd = launch_fork_command(
            &self.config.assistant_bin,
            &parent_assistant_session_id,
            &fork_assistant_session_id,
        );
        self.send_line(&fork_pane, &cmd).await?;

        let fork = Fork {
            id: fork_id,
            name: fork_name,
            parent_id,
            assistant_session_id: fork_assistant_session_id,
            pane_id: Some(fork_pane.0),
            status: ForkStatus::Active,
            created_at: now_rfc3339(),
            context_path: None,
            merged_at: None,
        };

        session.forks.push(fork.clone());
        store.replace_session(session).await.map_err(OrkaError::External)?;
        info!(session_id, fork_id = %fork.id, "fork created");
        Ok(fork)
    }

    /// Close a fork: kill its pane if present, mark `closed` (terminal —
    /// no pane, no context expected, per spec §9 open-question
    /// resolution).
    pub async fn close_fork(&self, project_root: &Path, session_id: &str, fork_id: &str) -> OrkaResult<Fork> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        let fork = self.close_fork_inner(&mut session, fork_id).await?;
        store.replace_session(session).await.map_err(OrkaError::External)?;
        Ok(fork)
    }

    /// Shared by `close_fork` and `close_session`'s "close every active
    /// fork" loop — mutates the in-memory `session` without persisting,
    /// so the caller controls the write boundary.
    pub(crate) async fn close_fork_inner(&self, session: &mut Session, fork_id: &str) -> OrkaResult<Fork> {
        let pane = session
            .find_fork(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?
            .pane_id
            .clone();
        if let Some(pane) = pane {
            let _ = self.mux.kill_pane(&PaneId::from(pane)).await;
        }
        let fork = session
            .find_fork_mut(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?;
        fork.pane_id = None;
        fork.status = ForkStatus::Closed;
        Ok(fork.clone())
    }

    /// Delete a fork: close first (killing the pane) if present, then
    /// remove the row entirely.
    pub async fn delete_fork(&self, project_root: &Path, session_id: &str, fork_id: &str) -> OrkaResult<()> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        if session.find_fork(fork_id).is_some() {
            let _ = self.close_fork_inner(&mut session, fork_id).await;
        }
        session.forks.retain(|f| f.id != fork_id);
        store.replace_session(session).await.map_err(OrkaError::External)?;
        Ok(())
    }

    pub(crate) fn resolve_branch_pane(&self, session: &Session, branch_id: &str) -> OrkaResult<PaneId> {
        let pane_id = if branch_id == MAIN_BRANCH_ID {
            session.main.pane_id.clone()
        } else {
            session.find_fork(branch_id).and_then(|f| f.pane_id.clone())
        };
        pane_id
            .map(PaneId::from)
            .ok_or_else(|| OrkaError::Precondition(format!("branch {branch_id} has no active pane")))
    }
}

#[cfg(test)]
#[path = "fork_tests.rs"]
mod tests;
