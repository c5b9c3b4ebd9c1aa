// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C1: durable, atomic snapshot of all projects, sessions, forks, and
//! agents. A single writer per project (`ProjectStore::with_write`); a
//! single global registry for cross-project bookkeeping.

pub mod atomic;
pub mod model;
pub mod project_store;
pub mod registry;

pub use model::{
    Branch, BranchStatus, Fork, ForkStatus, Project, Session, SessionStatus, StateDelta,
    MAIN_BRANCH_ID,
};
pub use project_store::ProjectStore;
pub use registry::{AgentConfig, AgentRegistry, ApprovalPolicy, EnabledHooks, ProjectEntry, ProjectRegistry};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

/// Process-wide holder of every open `ProjectStore`, keyed by canonical
/// project root. Construction is explicit (built once in `main`/`run`),
/// never a lazy global singleton (spec §9 design note).
pub struct AppStore {
    projects: RwLock<HashMap<PathBuf, Arc<ProjectStore>>>,
    pub registry: ProjectRegistry,
    pub agents: AgentRegistry,
}

impl AppStore {
    pub fn new(home_dir: &Path, agents_dir: &Path) -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            registry: ProjectRegistry::load(home_dir),
            agents: AgentRegistry::load(agents_dir),
        }
    }

    /// Get (or lazily open) the `ProjectStore` for a project root.
    pub async fn project(&self, root: &Path) -> Arc<ProjectStore> {
        if let Some(store) = self.projects.read().await.get(root) {
            return Arc::clone(store);
        }
        let mut projects = self.projects.write().await;
        if let Some(store) = projects.get(root) {
            return Arc::clone(store);
        }
        let store = Arc::new(ProjectStore::load(root));
        projects.insert(root.to_owned(), Arc::clone(&store));
        store
    }

    pub async fn open_projects(&self) -> Vec<PathBuf> {
        self.projects.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod app_store_tests {
    use super::*;

    #[tokio::test]
    async fn project_lookup_is_cached() {
        let home = tempfile::tempdir().unwrap();
        let agents = tempfile::tempdir().unwrap();
        let app = AppStore::new(home.path(), agents.path());
        let proj_dir = tempfile::tempdir().unwrap();

        let a = app.project(proj_dir.path()).await;
        let b = app.project(proj_dir.path()).await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
