// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The export/merge handshake (spec §4.3 "Export / Merge Protocol"): a
//! filesystem rendezvous between the orchestrator, the assistant running
//! in the fork, and the assistant running in the parent — there is no
//! direct IPC between the three.

use std::path::{Path, PathBuf};

use orka_mux::PaneId;
use tracing::info;

use crate::error::{OrkaError, OrkaResult};
use crate::orchestrator::{now_rfc3339, prompts, Orchestrator};
use crate::store::model::{Fork, ForkStatus};
use crate::store::ProjectStore;

/// Filesystem-safe timestamp suffix for export filenames: RFC3339 with
/// `:` replaced so the result is a valid path component on every OS.
fn filename_timestamp(rfc3339: &str) -> String {
    rfc3339.replace(':', "-")
}

fn export_filename(fork_name: &str, ts: &str) -> String {
    format!("fork-{fork_name}-{}.md", filename_timestamp(ts))
}

impl Orchestrator {
    /// Begin export: derive the absolute export path, inject the
    /// structured prompt into the fork's pane, record the relative path,
    /// and return immediately. The file is not yet written — the caller
    /// must wait (or use `auto_merge_fork`, which sleeps for them).
    pub async fn export_fork(&self, project_root: &Path, session_id: &str, fork_id: &str) -> OrkaResult<String> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        let fork = session
            .find_fork(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?
            .clone();
        let pane = fork
            .pane_id
            .clone()
            .map(PaneId::from)
            .ok_or_else(|| OrkaError::Precondition(format!("fork {fork_id} has no active pane")))?;

        let ts = now_rfc3339();
        let filename = export_filename(&fork.name, &ts);
        let absolute_path = ProjectStore::exports_dir(project_root).join(&filename);
        let relative_path = format!(".orka/exports/{filename}");

        let prompt = prompts::export_prompt(&fork.name, &absolute_path.to_string_lossy());
        self.send_line(&pane, &prompt).await?;

        let fork_mut = session
            .find_fork_mut(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?;
        fork_mut.context_path = Some(relative_path.clone());
        store.replace_session(session).await.map_err(OrkaError::External)?;

        info!(session_id, fork_id, path = %relative_path, "export requested");
        Ok(relative_path)
    }

    /// Complete the merge: resolve the export file (tolerating path
    /// drift), inject the merge prompt into the parent's pane, kill the
    /// fork's pane, and mark it `merged`.
    pub async fn merge_fork(&self, project_root: &Path, session_id: &str, fork_id: &str) -> OrkaResult<Fork> {
        let store = self.project_store(project_root).await;
        let mut session = store
            .get_session(session_id)
            .await
            .ok_or_else(|| OrkaError::NotFound(format!("session {session_id}")))?;
        let fork = session
            .find_fork(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?
            .clone();

        let Some(recorded_relative) = fork.context_path.clone() else {
            return Err(OrkaError::Precondition(format!("fork {fork_id} has not been exported")));
        };

        let relative_path = resolve_export_path(project_root, &fork.name, &recorded_relative)?;

        let parent_pane = self.resolve_branch_pane(&session, &fork.parent_id)?;
        let prompt = prompts::merge_prompt(&fork.name, &relative_path);
        self.send_line(&parent_pane, &prompt).await?;

        if let Some(pane) = fork.pane_id.clone() {
            let _ = self.mux.kill_pane(&PaneId::from(pane)).await;
        }

        let fork_mut = session
            .find_fork_mut(fork_id)
            .ok_or_else(|| OrkaError::NotFound(format!("fork {fork_id}")))?;
        fork_mut.pane_id = None;
        fork_mut.status = ForkStatus::Merged;
        fork_mut.merged_at = Some(now_rfc3339());
        fork_mut.context_path = Some(relative_path);
        let result = fork_mut.clone();

        store.replace_session(session).await.map_err(OrkaError::External)?;
        info!(session_id, fork_id, "fork merged");
        Ok(result)
    }

    /// Export, sleep the configured wait, then merge. The wait is
    /// cancelled if the session is closed while it's in flight (spec §5
    /// "closing a session cancels any pending export/merge wait").
    pub async fn auto_merge_fork(&self, project_root: &Path, session_id: &str, fork_id: &str) -> OrkaResult<Fork> {
        self.export_fork(project_root, session_id, fork_id).await?;

        let cancel = self.register_merge_wait(session_id, fork_id).await;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(OrkaError::Cancellation),
            _ = tokio::time::sleep(self.config.auto_merge_wait) => Ok(()),
        };
        self.clear_merge_wait(session_id, fork_id).await;
        outcome?;

        self.merge_fork(project_root, session_id, fork_id).await
    }
}

/// A file the assistant hasn't finished writing yet reads the same as a
/// file that doesn't exist — the orchestrator never parses the export,
/// but an empty one means the write is still in flight (spec "Export
/// prompt": "verifies it exists and is non-empty").
fn is_written(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// If the recorded path exists and is non-empty, use it. Otherwise search
/// the exports directory for the most recent non-empty
/// `fork-<name>-*.md` and adopt that one (spec §4.3 step 2, property 6
/// "export path drift").
fn resolve_export_path(project_root: &Path, fork_name: &str, recorded_relative: &str) -> OrkaResult<String> {
    let recorded_absolute = project_root.join(recorded_relative);
    if is_written(&recorded_absolute) {
        return Ok(recorded_relative.to_owned());
    }

    let exports_dir = ProjectStore::exports_dir(project_root);
    let prefix = format!("fork-{fork_name}-");
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&exports_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".md") && is_written(&entry.path()) {
                if let Ok(meta) = entry.metadata() {
                    if let Ok(modified) = meta.modified() {
                        candidates.push((modified, entry.path()));
                    }
                }
            }
        }
    }

    candidates.sort_by_key(|(modified, _)| *modified);
    let Some((_, path)) = candidates.into_iter().next_back() else {
        return Err(OrkaError::NotFound(format!("no export found for fork {fork_name}")));
    };

    let relative = path
        .strip_prefix(project_root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string_lossy().into_owned());
    Ok(relative)
}

#[cfg(test)]
#[path = "export_merge_tests.rs"]
mod tests;
