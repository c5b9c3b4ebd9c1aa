// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted entity types: `Project`, `Session`, `Branch`, `Fork`. Field
//! names are `camelCase` on the wire to match the JSON shapes in the
//! external HTTP surface and the on-disk state file.

use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Root node identifier. Always resolves to `Session::main`.
pub const MAIN_BRANCH_ID: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    Active,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkStatus {
    Active,
    Saved,
    Closed,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Saved,
}

/// The root branch of a session's conversation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub assistant_session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
    pub status: BranchStatus,
}

impl Branch {
    pub fn is_active(&self) -> bool {
        self.status == BranchStatus::Active
    }
}

/// A non-root node in a session's conversation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fork {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub assistant_session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
    pub status: ForkStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<String>,
}

impl Fork {
    pub fn is_active(&self) -> bool {
        self.status == ForkStatus::Active
    }

    /// Invariant 3: a non-terminal fork is still in play as a potential
    /// "active child" even while `saved`, since it can be resumed to
    /// active without going through fork creation again. Only `Closed`
    /// and `Merged` are permanently out of consideration.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ForkStatus::Closed | ForkStatus::Merged)
    }
}

/// Auxiliary web-terminal bridge process, if one was started for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeInfo {
    pub port: u16,
    pub pid: u32,
}

/// One logical container for an assistant conversation tree in one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub last_activity_at: String,
    pub status: SessionStatus,
    pub mux_session_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeInfo>,
    pub main: Branch,
    pub forks: Vec<Fork>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Find a fork by id, or `None` if `branch_id` is `"main"` / unknown.
    pub fn find_fork(&self, fork_id: &str) -> Option<&Fork> {
        self.forks.iter().find(|f| f.id == fork_id)
    }

    pub fn find_fork_mut(&mut self, fork_id: &str) -> Option<&mut Fork> {
        self.forks.iter_mut().find(|f| f.id == fork_id)
    }

    /// Resolve a branch id ("main" or a fork id) to its assistant-session id.
    pub fn resolve_assistant_session_id(&self, branch_id: &str) -> Option<&str> {
        if branch_id == MAIN_BRANCH_ID {
            Some(&self.main.assistant_session_id)
        } else {
            self.find_fork(branch_id).map(|f| f.assistant_session_id.as_str())
        }
    }

    /// Invariant 3: whether `parent_id` already has an active child fork.
    pub fn has_active_child(&self, parent_id: &str) -> bool {
        self.forks.iter().any(|f| f.parent_id == parent_id && f.is_active())
    }

    /// All branch ids currently carrying a pane (main + forks), used by
    /// recovery to decide what needs re-attaching.
    pub fn non_terminal_forks(&self) -> impl Iterator<Item = &Fork> {
        self.forks.iter().filter(|f| !f.is_terminal())
    }
}

/// Per-project durable snapshot: `<project>/.orka/state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub version: u32,
    pub project_path: String,
    pub sessions: Vec<Session>,
    pub last_updated: String,
}

impl Project {
    pub fn empty(project_path: impl Into<String>, now: &str) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            project_path: project_path.into(),
            sessions: Vec::new(),
            last_updated: now.to_owned(),
        }
    }

    pub fn find_session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn find_session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }
}

/// A diff broadcast to control-surface subscribers after every successful
/// `with_write`. Carries only the affected session id and a human label —
/// clients re-fetch the full session via REST rather than trust a partial
/// patch over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    pub session_id: Option<String>,
    pub kind: String,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
