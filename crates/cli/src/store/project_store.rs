// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe access to a single project's `state.json`. One
//! `ProjectStore` per registered project, each owning its own write mutex
//! (spec §5 "per project: all state mutations are serialized by the
//! project's mutex").

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, warn};

use crate::event::epoch_to_rfc3339;
use crate::store::atomic::{quarantine, read_json, write_json};
use crate::store::model::{
    Branch, Fork, Project, Session, StateDelta, CURRENT_SCHEMA_VERSION,
};

const STATE_FILE: &str = "state.json";
const THEME_FILE: &str = "theme.conf";
const DEFAULT_THEME: &str = "# orka default theme\n";

fn now_rfc3339() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    epoch_to_rfc3339(secs)
}

/// Per-project durable store: in-memory snapshot behind a `RwLock`, writes
/// serialized by `write_lock`, broadcasts a `StateDelta` after every
/// successful mutation (consumed by the control surface's WS push).
pub struct ProjectStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    snapshot: RwLock<Project>,
    changes: broadcast::Sender<StateDelta>,
}

impl ProjectStore {
    /// `<project>/.orka`
    pub fn orka_dir(root: &Path) -> PathBuf {
        root.join(".orka")
    }

    pub fn state_path(root: &Path) -> PathBuf {
        Self::orka_dir(root).join(STATE_FILE)
    }

    pub fn exports_dir(root: &Path) -> PathBuf {
        Self::orka_dir(root).join("exports")
    }

    pub fn uploads_dir(root: &Path) -> PathBuf {
        Self::orka_dir(root).join("uploads")
    }

    /// Load (or freshly initialize) the project rooted at `project_root`.
    pub fn load(project_root: &Path) -> Self {
        let path = Self::state_path(project_root);
        let project = match read_json::<Project>(&path) {
            Ok(Some(mut project)) => {
                if project.version != CURRENT_SCHEMA_VERSION {
                    reinitialize(project_root);
                    project.version = CURRENT_SCHEMA_VERSION;
                }
                project
            }
            Ok(None) => {
                reinitialize(project_root);
                Project::empty(project_root.to_string_lossy(), &now_rfc3339())
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "state.json corrupted, quarantining");
                if let Err(qe) = quarantine(&path, &now_rfc3339().replace([':', '-'], "")) {
                    warn!(error = %qe, "failed to quarantine corrupted state file");
                }
                reinitialize(project_root);
                Project::empty(project_root.to_string_lossy(), &now_rfc3339())
            }
        };

        let (tx, _rx) = broadcast::channel(256);
        Self {
            root: project_root.to_owned(),
            write_lock: Mutex::new(()),
            snapshot: RwLock::new(project),
            changes: tx,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateDelta> {
        self.changes.subscribe()
    }

    /// A consistent read-only snapshot. Readers never observe a partial
    /// update — the `RwLock` is only ever updated after a successful
    /// atomic write.
    pub async fn snapshot(&self) -> Project {
        self.snapshot.read().await.clone()
    }

    /// Read-modify-write under the project's write mutex. `mutate` runs
    /// to completion while holding the lock; the resulting snapshot is
    /// persisted by atomic rename before the lock is released, so readers
    /// never see a half-written file.
    pub async fn with_write<F, R>(&self, delta_kind: &str, session_id: Option<&str>, mutate: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut Project) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut project = self.snapshot.read().await.clone();
        let result = mutate(&mut project);
        project.last_updated = now_rfc3339();
        write_json(&Self::state_path(&self.root), &project)?;
        *self.snapshot.write().await = project;
        let _ = self.changes.send(StateDelta {
            session_id: session_id.map(|s| s.to_owned()),
            kind: delta_kind.to_owned(),
        });
        Ok(result)
    }

    // -- Per-entity conveniences ------------------------------------------

    pub async fn add_session(&self, session: Session) -> anyhow::Result<Session> {
        let id = session.id.clone();
        self.with_write("session_added", Some(&id), move |project| {
            project.sessions.push(session.clone());
            session
        })
        .await
    }

    pub async fn replace_session(&self, session: Session) -> anyhow::Result<()> {
        let id = session.id.clone();
        self.with_write("session_updated", Some(&id), move |project| {
            if let Some(slot) = project.find_session_mut(&id) {
                *slot = session;
            }
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> anyhow::Result<bool> {
        self.with_write("session_deleted", Some(session_id), |project| {
            let before = project.sessions.len();
            project.sessions.retain(|s| s.id != session_id);
            project.sessions.len() != before
        })
        .await
    }

    pub async fn add_fork(&self, session_id: &str, fork: Fork) -> anyhow::Result<Option<Fork>> {
        let session_id = session_id.to_owned();
        self.with_write("fork_added", Some(&session_id), move |project| {
            let session = project.find_session_mut(&session_id)?;
            session.forks.push(fork.clone());
            Some(fork)
        })
        .await
    }

    pub async fn update_fork(&self, session_id: &str, fork: Fork) -> anyhow::Result<bool> {
        let session_id = session_id.to_owned();
        self.with_write("fork_updated", Some(&session_id), move |project| {
            let Some(session) = project.find_session_mut(&session_id) else { return false };
            if let Some(slot) = session.find_fork_mut(&fork.id) {
                *slot = fork;
                true
            } else {
                false
            }
        })
        .await
    }

    pub async fn delete_fork(&self, session_id: &str, fork_id: &str) -> anyhow::Result<bool> {
        let session_id = session_id.to_owned();
        let fork_id = fork_id.to_owned();
        self.with_write("fork_deleted", Some(&session_id), move |project| {
            let Some(session) = project.find_session_mut(&session_id) else { return false };
            let before = session.forks.len();
            session.forks.retain(|f| f.id != fork_id);
            session.forks.len() != before
        })
        .await
    }

    pub async fn list_sessions(&self, active_only: bool) -> Vec<Session> {
        let project = self.snapshot.read().await;
        project
            .sessions
            .iter()
            .filter(|s| !active_only || s.is_active())
            .cloned()
            .collect()
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Session> {
        self.snapshot.read().await.find_session(session_id).cloned()
    }

    pub async fn get_fork(&self, session_id: &str, fork_id: &str) -> Option<Fork> {
        self.snapshot
            .read()
            .await
            .find_session(session_id)
            .and_then(|s| s.find_fork(fork_id))
            .cloned()
    }

    pub async fn touch_activity(&self, session_id: &str) -> anyhow::Result<()> {
        let session_id = session_id.to_owned();
        self.with_write("activity", Some(&session_id), move |project| {
            if let Some(session) = project.find_session_mut(&session_id) {
                session.last_activity_at = now_rfc3339();
            }
        })
        .await
    }

    pub async fn update_main(&self, session_id: &str, main: Branch) -> anyhow::Result<bool> {
        let session_id = session_id.to_owned();
        self.with_write("main_updated", Some(&session_id), move |project| {
            let Some(session) = project.find_session_mut(&session_id) else { return false };
            session.main = main;
            true
        })
        .await
    }
}

/// Schema-version mismatch / first-run path: refresh auxiliary files
/// without discarding any session rows (the rows live in `state.json`
/// itself, untouched by this pass).
fn reinitialize(project_root: &Path) {
    let orka_dir = ProjectStore::orka_dir(project_root);
    if let Err(e) = std::fs::create_dir_all(&orka_dir) {
        warn!(error = %e, "failed to create .orka directory");
        return;
    }
    if let Err(e) = std::fs::create_dir_all(ProjectStore::exports_dir(project_root)) {
        warn!(error = %e, "failed to create exports directory");
    }
    if let Err(e) = std::fs::create_dir_all(ProjectStore::uploads_dir(project_root)) {
        warn!(error = %e, "failed to create uploads directory");
    }
    let theme_path = orka_dir.join(THEME_FILE);
    if !theme_path.exists() {
        let _ = std::fs::write(&theme_path, DEFAULT_THEME);
    }
}

#[cfg(test)]
#[path = "project_store_tests.rs"]
mod tests;
