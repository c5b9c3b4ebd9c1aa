// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: create, resume, close, delete. Algorithms match
//! spec §4.3 exactly; see `recovery.rs` for the full-recovery branch of
//! resume and `fork.rs` for fork operations nested inside close/delete.

use std::path::Path;

use orka_mux::PaneId;
use tracing::info;

use crate::error::{OrkaError, OrkaResult};
use crate::orchestrator::{
    bridge, launch_new_command, launch_resume_command, mux_err, new_uuid, now_rfc3339, Orchestrator,
};
use crate::store::model::{Branch, BranchStatus, Session, SessionStatus};

impl Orchestrator {
    /// Create a new session: allocate ids, create the multiplexer
    /// session, launch the assistant (fresh or continuing), best-effort
    /// start the bridge, and persist as `active`.
    pub async fn create_session(
        &self,
        project_root: &Path,
        name: Option<String>,
        continue_from: Option<String>,
    ) -> OrkaResult<Session> {
        let store = self.project_store(project_root).await;

        let session_id = new_uuid();
        let mux_session_name = format!("orka-{session_id}");
        let name = name.unwrap_or_else(|| session_id[..8].to_owned());

        self.mux
            .create_session(&mux_session_name, project_root)
            .await
            .map_err(mux_err)?;
        tokio::time::sleep(self.config.shell_settle).await;

        let main_pane = self.mux.get_main_pane(&mux_session_name).await.map_err(mux_err)?;
        self.mux.set_pane_title(&main_pane, "MAIN").await.map_err(mux_err)?;

        let assistant_session_id = match continue_from {
            Some(id) => {
                let cmd = launch_resume_command(&self.config.assistant_bin, &id);
                self.send_line(&main_pane, &cmd).await?;
                id
            }
            None => {
                let id = new_uuid();
                let cmd = launch_new_command(&self.config.assistant_bin, &id);
                self.send_line(&main_pane, &cmd).await?;
                id
            }
        };

        let bridge_info = match bridge::claim_port(self.config.bridge_base_port, &self.config.host).await {
            Some(port) => bridge::spawn(&self.config.bridge_bin, port, &mux_session_name).await,
            None => None,
        };

        let now = now_rfc3339();
        let session = Session {
            id: session_id,
            name,
            created_at: now.clone(),
            last_activity_at: now,
            status: SessionStatus::Active,
            mux_session_name,
            bridge: bridge_info,
            main: Branch {
                assistant_session_id,
                pane_id: Some(main_pane.0),
                status: BranchStatus::Active,
            },
            forks: Vec::new(),
        };

        store.add_session(session.clone()).await.map_err(OrkaError::External)?;
        info!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// Resume a `saved` session: reattach if the multiplexer session is
    /// still alive, otherwise fully recover it (see `recovery.rs`).
    pub async fn resume_session(&self, project_root: &Path, session_id: &str) -> OrkaResult<Session> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;

        let exists = self.mux.session_exists(&session.mux_session_name).await.map_err(mux_err)?;
        if exists {
            self.reattach_session(&mut session).await?;
        } else {
            self.recover_session(project_root, &mut session).await?;
        }

        session.status = SessionStatus::Active;
        store.replace_session(session.clone()).await.map_err(OrkaError::External)?;
        Ok(session)
    }

    /// Reattach path: multiplexer session still exists.
    pub(crate) async fn reattach_session(&self, session: &mut Session) -> OrkaResult<()> {
        let main_pane = self.mux.get_main_pane(&session.mux_session_name).await.map_err(mux_err)?;
        session.main.pane_id = Some(main_pane.0);
        session.main.status = BranchStatus::Active;

        if session.bridge.is_none() {
            if let Some(port) = bridge::claim_port(self.config.bridge_base_port, &self.config.host).await {
                session.bridge = bridge::spawn(&self.config.bridge_bin, port, &session.mux_session_name).await;
            }
        } else if let Some(ref b) = session.bridge {
            if !bridge::is_healthy(b.port).await {
                if let Some(port) = bridge::claim_port(self.config.bridge_base_port, &self.config.host).await {
                    session.bridge = bridge::spawn(&self.config.bridge_bin, port, &session.mux_session_name).await;
                }
            }
        }

        self.reattach_or_relaunch_forks(session).await
    }

    /// Close a session: close every active fork, stop the bridge, kill
    /// the multiplexer session, mark session + main as `saved`.
    pub async fn close_session(&self, project_root: &Path, session_id: &str) -> OrkaResult<Session> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;

        self.cancel_merge_waits(session_id).await;

        loop {
            let Some(active_fork_id) =
                session.forks.iter().find(|f| f.is_active()).map(|f| f.id.clone())
            else {
                break;
            };
            self.close_fork_inner(&mut session, &active_fork_id).await?;
        }

        if let Some(pane) = session.main.pane_id.take() {
            let _ = self.mux.kill_pane(&PaneId::from(pane)).await;
        }
        let _ = self.mux.kill_session(&session.mux_session_name).await;

        session.main.status = BranchStatus::Saved;
        session.status = SessionStatus::Saved;
        store.replace_session(session.clone()).await.map_err(OrkaError::External)?;
        Ok(session)
    }

    /// Delete a session: close first if active, then remove the row.
    pub async fn delete_session(&self, project_root: &Path, session_id: &str) -> OrkaResult<()> {
        let store = self.project_store(project_root).await;
        let session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;

        if session.is_active() {
            self.close_session(project_root, session_id).await?;
        }
        store.delete_session(session_id).await.map_err(OrkaError::External)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
