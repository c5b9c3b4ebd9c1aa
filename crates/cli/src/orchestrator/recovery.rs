// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two distinct recovery paths: per-session full recovery (invoked from
//! `resume_session` when the multiplexer session itself is gone) and the
//! startup recovery pass (invoked once at daemon boot over every
//! registered project's `active` sessions).

use std::path::Path;

use orka_mux::PaneId;
use tracing::{info, warn};

use crate::error::{OrkaError, OrkaResult};
use crate::orchestrator::{bridge, launch_resume_command, mux_err, Orchestrator};
use crate::store::model::{BranchStatus, ForkStatus, Session};
use crate::store::{AppStore, MAIN_BRANCH_ID};

impl Orchestrator {
    /// Forks whose previous status was `active` or `saved` are
    /// recursively re-attached (pane still present) or re-launched
    /// (pane gone, split + `resume <ownAssistantSessionId>`); forks in
    /// `closed`/`merged` are left untouched.
    pub(crate) async fn reattach_or_relaunch_forks(&self, session: &mut Session) -> OrkaResult<()> {
        let live_panes: std::collections::HashSet<String> = self
            .mux
            .list_panes(&session.mux_session_name)
            .await
            .map_err(mux_err)?
            .into_iter()
            .map(|p| p.0)
            .collect();

        // Process in creation order so a parent fork is already re-attached
        // (and therefore splittable) before any of its children.
        let mut fork_ids: Vec<String> = session
            .non_terminal_forks()
            .map(|f| f.id.clone())
            .collect();
        fork_ids.sort_by_key(|id| session.find_fork(id).map(|f| f.created_at.clone()).unwrap_or_default());

        for fork_id in fork_ids {
            let still_present = session
                .find_fork(&fork_id)
                .and_then(|f| f.pane_id.clone())
                .is_some_and(|p| live_panes.contains(&p));

            if still_present {
                if let Some(fork) = session.find_fork_mut(&fork_id) {
                    fork.status = ForkStatus::Active;
                }
                continue;
            }

            self.relaunch_fork_pane(session, &fork_id).await?;
        }
        Ok(())
    }

    async fn relaunch_fork_pane(&self, session: &mut Session, fork_id: &str) -> OrkaResult<()> {
        let (parent_id, assistant_session_id) = {
            let fork = session
                .find_fork(fork_id)
                .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?;
            (fork.parent_id.clone(), fork.assistant_session_id.clone())
        };

        let parent_pane = if parent_id == MAIN_BRANCH_ID {
            session.main.pane_id.clone()
        } else {
            session.find_fork(&parent_id).and_then(|f| f.pane_id.clone())
        };
        let Some(parent_pane) = parent_pane else {
            warn!(fork_id, parent_id, "parent pane missing, cannot relaunch fork");
            return Ok(());
        };

        self.mux.select_pane(&PaneId::from(parent_pane)).await.map_err(mux_err)?;
        let pane = self.mux.split_pane(&session.mux_session_name, true).await.map_err(mux_err)?;

        let fork_name = session.find_fork(fork_id).map(|f| f.name.clone()).unwrap_or_default();
        self.mux.set_pane_title(&pane, &fork_name).await.map_err(mux_err)?;

        let cmd = launch_resume_command(&self.config.assistant_bin, &assistant_session_id);
        self.send_line(&pane, &cmd).await?;

        if let Some(fork) = session.find_fork_mut(fork_id) {
            fork.pane_id = Some(pane.0);
            fork.status = ForkStatus::Active;
        }
        Ok(())
    }

    /// Full recovery: the multiplexer session itself is gone. Recreate
    /// it, reapply the theme, relaunch the main assistant conversation,
    /// then re-attach every non-terminal fork the same way.
    pub(crate) async fn recover_session(&self, project_root: &Path, session: &mut Session) -> OrkaResult<()> {
        info!(session_id = %session.id, "recovering session after multiplexer session loss");

        self.mux
            .create_session(&session.mux_session_name, project_root)
            .await
            .map_err(mux_err)?;
        tokio::time::sleep(self.config.shell_settle).await;
        reapply_theme(project_root);

        let main_pane = self.mux.get_main_pane(&session.mux_session_name).await.map_err(mux_err)?;
        self.mux.set_pane_title(&main_pane, "MAIN").await.map_err(mux_err)?;
        let cmd = launch_resume_command(&self.config.assistant_bin, &session.main.assistant_session_id);
        self.send_line(&main_pane, &cmd).await?;

        session.main.pane_id = Some(main_pane.0);
        session.main.status = BranchStatus::Active;

        if let Some(port) = bridge::claim_port(self.config.bridge_base_port, &self.config.host).await {
            session.bridge = bridge::spawn(&self.config.bridge_bin, port, &session.mux_session_name).await;
        }

        // Every non-terminal fork's pane is necessarily gone too (the
        // whole multiplexer session was lost) — relaunch all of them.
        let mut fork_ids: Vec<String> = session.non_terminal_forks().map(|f| f.id.clone()).collect();
        fork_ids.sort_by_key(|id| session.find_fork(id).map(|f| f.created_at.clone()).unwrap_or_default());
        for fork_id in fork_ids {
            self.relaunch_fork_pane(session, &fork_id).await?;
        }
        Ok(())
    }
}

fn reapply_theme(project_root: &Path) {
    let theme_path = crate::store::ProjectStore::orka_dir(project_root).join("theme.conf");
    if !theme_path.exists() {
        let _ = std::fs::write(&theme_path, "# orka default theme\n");
    }
}

/// Startup recovery pass (run once at daemon boot, per-project): for
/// every session marked `active` in `state.json`, probe whether the
/// multiplexer session still exists. If not, the session is left
/// `active` but pane-less until the next explicit `resume` call — never
/// silently downgraded to `saved`, which would discard the user's intent
/// to keep working (spec §4.3 "Creating a fork" preamble + SPEC_FULL.md
/// `orchestrator::recovery`).
pub async fn startup_recovery_pass(
    store: &AppStore,
    mux: &(dyn orka_mux::Multiplexer),
    project_roots: &[std::path::PathBuf],
) {
    for root in project_roots {
        let project_store = store.project(root).await;
        let sessions = project_store.list_sessions(true).await;
        for session in sessions {
            match mux.session_exists(&session.mux_session_name).await {
                Ok(true) => {
                    info!(session_id = %session.id, "startup recovery: multiplexer session still alive");
                }
                Ok(false) => {
                    warn!(
                        session_id = %session.id,
                        "startup recovery: multiplexer session missing, awaiting explicit resume"
                    );
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "startup recovery: probe failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
