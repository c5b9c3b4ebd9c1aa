// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two per-user global documents: the registered-project list
//! (`~/.orka/config.json`) and the agent configuration list
//! (`~/.orka-agents/agents.json`). Both use the same atomic-write helper
//! as the per-project state file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::event::epoch_to_rfc3339;
use crate::store::atomic::{read_json, write_json};

fn now_rfc3339() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    epoch_to_rfc3339(secs)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub path: String,
    pub name: String,
    pub added_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub server_port: Option<u16>,
    #[serde(default)]
    pub bridge_base_port: Option<u16>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// `~/.orka/config.json`: registered projects and reserved ports.
pub struct ProjectRegistry {
    path: PathBuf,
    inner: RwLock<RegistryFile>,
}

impl ProjectRegistry {
    pub fn load(home_dir: &Path) -> Self {
        let path = home_dir.join("config.json");
        let file = read_json::<RegistryFile>(&path).ok().flatten().unwrap_or_default();
        Self { path, inner: RwLock::new(file) }
    }

    pub async fn list(&self) -> Vec<ProjectEntry> {
        self.inner.read().await.projects.clone()
    }

    pub async fn register(&self, path: &str, name: &str) -> anyhow::Result<ProjectEntry> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.projects.iter().find(|p| p.path == path) {
            return Ok(existing.clone());
        }
        let entry = ProjectEntry {
            path: path.to_owned(),
            name: name.to_owned(),
            added_at: now_rfc3339(),
            last_opened: None,
        };
        inner.projects.push(entry.clone());
        inner.last_updated = Some(now_rfc3339());
        write_json(&self.path, &*inner)?;
        Ok(entry)
    }

    /// Deregistration never touches the project's own files — only the
    /// pointer to it is removed.
    pub async fn deregister(&self, path: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.projects.len();
        inner.projects.retain(|p| p.path != path);
        let removed = inner.projects.len() != before;
        if removed {
            inner.last_updated = Some(now_rfc3339());
            write_json(&self.path, &*inner)?;
        }
        Ok(removed)
    }

    pub async fn touch_last_opened(&self, path: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.projects.iter_mut().find(|p| p.path == path) {
            entry.last_opened = Some(now_rfc3339());
            write_json(&self.path, &*inner)?;
        }
        Ok(())
    }
}

/// Agent hook-event enablement: the full §6 event-type list, each
/// individually toggleable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledHooks {
    #[serde(default = "default_true")]
    pub session_start: bool,
    #[serde(default = "default_true")]
    pub stop: bool,
    #[serde(default = "default_true")]
    pub notification: bool,
    #[serde(default = "default_true")]
    pub pre_tool_use: bool,
    #[serde(default = "default_true")]
    pub post_tool_use: bool,
    #[serde(default = "default_true")]
    pub pre_compact: bool,
    #[serde(default = "default_true")]
    pub permission: bool,
    #[serde(default = "default_true")]
    pub user_prompt_submit: bool,
    #[serde(default = "default_true")]
    pub subagent: bool,
    #[serde(default = "default_true")]
    pub error: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EnabledHooks {
    fn default() -> Self {
        Self {
            session_start: true,
            stop: true,
            notification: true,
            pre_tool_use: true,
            post_tool_use: true,
            pre_compact: true,
            permission: true,
            user_prompt_submit: true,
            subagent: true,
            error: true,
        }
    }
}

impl EnabledHooks {
    pub fn is_enabled(&self, kind: crate::event::HookEventKind) -> bool {
        use crate::event::HookEventKind as K;
        match kind {
            K::SessionStart => self.session_start,
            K::Stop => self.stop,
            K::Notification => self.notification,
            K::PreToolUse => self.pre_tool_use,
            K::PostToolUse => self.post_tool_use,
            K::PreCompact => self.pre_compact,
            K::Permission => self.permission,
            K::UserPromptSubmit => self.user_prompt_submit,
            K::Subagent => self.subagent,
            K::Error => self.error,
        }
    }
}

/// Policy governing the fast path's auto-approve/deny decisions — kept
/// separate from `EnabledHooks` (which gates *whether* an event is
/// processed at all) per §4.5's distinct "Guard" and "Fast path" stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPolicy {
    #[serde(default)]
    pub auto_approve_tools: Vec<String>,
    #[serde(default)]
    pub auto_deny_tools: Vec<String>,
}

impl ApprovalPolicy {
    pub fn decision_for_tool(&self, tool: &str) -> Option<bool> {
        if self.auto_approve_tools.iter().any(|t| t == tool) {
            Some(true)
        } else if self.auto_deny_tools.iter().any(|t| t == tool) {
            Some(false)
        } else {
            None
        }
    }
}

/// Per-session supervisor configuration, persisted globally by agent id
/// (per spec §3: "Agents are not part of session state").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub id: String,
    pub project_path: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_credentials: Option<String>,
    #[serde(default)]
    pub enabled_hooks: EnabledHooks,
    #[serde(default)]
    pub approval_policy: ApprovalPolicy,
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_interval_secs: u64,
    #[serde(default)]
    pub running: bool,
}

fn default_watchdog_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AgentsFile {
    #[serde(default)]
    agents: Vec<AgentConfig>,
}

/// `~/.orka-agents/agents.json`.
pub struct AgentRegistry {
    path: PathBuf,
    inner: RwLock<AgentsFile>,
}

impl AgentRegistry {
    pub fn load(agents_dir: &Path) -> Self {
        let path = agents_dir.join("agents.json");
        let file = read_json::<AgentsFile>(&path).ok().flatten().unwrap_or_default();
        Self { path, inner: RwLock::new(file) }
    }

    pub async fn list(&self) -> Vec<AgentConfig> {
        self.inner.read().await.agents.clone()
    }

    pub async fn get(&self, id: &str) -> Option<AgentConfig> {
        self.inner.read().await.agents.iter().find(|a| a.id == id).cloned()
    }

    pub async fn upsert(&self, agent: AgentConfig) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.agents.iter_mut().find(|a| a.id == agent.id) {
            *slot = agent;
        } else {
            inner.agents.push(agent);
        }
        write_json(&self.path, &*inner)?;
        Ok(())
    }

    pub async fn set_running(&self, id: &str, running: bool) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(slot) = inner.agents.iter_mut().find(|a| a.id == id) else { return Ok(false) };
        slot.running = running;
        write_json(&self.path, &*inner)?;
        Ok(true)
    }

    pub async fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.agents.len();
        inner.agents.retain(|a| a.id != id);
        let removed = inner.agents.len() != before;
        if removed {
            write_json(&self.path, &*inner)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
