// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-agent event loop: Guard -> Route -> Capture -> Parse -> Fast
//! path -> LLM fallback -> Execute -> Log (spec §4.5). One
//! [`AgentSupervisor`] owns exactly one agent's queue for its lifetime;
//! it is the sole writer of the watchdog's K/M debounce counters since it
//! is the only consumer able to observe "consecutive" correctly.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use orka_mux::PaneId;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::event::StampedHookEvent;
use crate::orchestrator::{mux_err, now_rfc3339, Orchestrator};
use crate::store::{AgentConfig, AppStore};

use super::chat::ChatNotifier;
use super::fast_path::{self, Action};
use super::llm_fallback::{DecisionMaker, DecisionRequest};
use super::terminal_parser::{self, TerminalPatterns, TerminalState};
use super::{AgentMsg, DECISION_LOG_CAPACITY};

const HISTORY_CAPACITY: usize = 20;

/// One row of an agent's decision history, exposed read-only via the
/// control surface (`GET /api/agents/:id/log`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionLogEntry {
    pub timestamp: String,
    pub source: String,
    pub terminal_state: String,
    pub action: String,
    pub reason: String,
}

pub struct AgentSupervisor {
    agent: AgentConfig,
    store: Arc<AppStore>,
    orchestrator: Arc<Orchestrator>,
    decision_maker: Arc<dyn DecisionMaker>,
    chat: Arc<dyn ChatNotifier>,
    decision_log: Arc<Mutex<VecDeque<DecisionLogEntry>>>,
    patterns: Arc<TerminalPatterns>,
    watchdog_k: u32,
    watchdog_m: u32,
    capture_lines: u32,
}

impl AgentSupervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: AgentConfig,
        store: Arc<AppStore>,
        orchestrator: Arc<Orchestrator>,
        decision_maker: Arc<dyn DecisionMaker>,
        chat: Arc<dyn ChatNotifier>,
        decision_log: Arc<Mutex<VecDeque<DecisionLogEntry>>>,
        patterns: Arc<TerminalPatterns>,
        watchdog_k: u32,
        watchdog_m: u32,
        capture_lines: u32,
    ) -> Self {
        Self {
            agent,
            store,
            orchestrator,
            decision_maker,
            chat,
            decision_log,
            patterns,
            watchdog_k: watchdog_k.max(1),
            watchdog_m: watchdog_m.max(1),
            capture_lines,
        }
    }

    /// Drain the inbound queue in strict arrival order until cancelled or
    /// poisoned with [`AgentMsg::Stop`].
    pub async fn run(self, mut rx: mpsc::Receiver<AgentMsg>, cancel: CancellationToken) {
        let mut history: VecDeque<String> = VecDeque::with_capacity(HISTORY_CAPACITY);
        let mut idle_streak: u32 = 0;
        let mut last_verdict: Option<Action> = None;
        let mut verdict_streak: u32 = 0;

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(m) => m,
                    None => break,
                },
            };
            match msg {
                AgentMsg::Stop => break,
                AgentMsg::Hook(event) => {
                    self.handle_hook(event, &mut history, &cancel).await;
                    idle_streak = 0;
                    verdict_streak = 0;
                    last_verdict = None;
                }
                AgentMsg::Watchdog => {
                    self.handle_watchdog(
                        &mut history,
                        &mut idle_streak,
                        &mut last_verdict,
                        &mut verdict_streak,
                        &cancel,
                    )
                    .await;
                }
            }
        }
        info!(agent_id = %self.agent.id, "agent supervisor loop exited");
    }

    async fn resolve_pane(&self) -> Option<PaneId> {
        let project_root = Path::new(&self.agent.project_path);
        let store = self.store.project(project_root).await;
        let session = store.get_session(&self.agent.session_id).await?;
        session.main.pane_id.map(PaneId::from)
    }

    async fn capture(&self, pane: &PaneId) -> Option<String> {
        match self.orchestrator.mux.capture_pane(pane, self.capture_lines).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(agent_id = %self.agent.id, error = %mux_err(err), "failed to capture pane for supervisor");
                None
            }
        }
    }

    /// Race a decision-maker call against the agent's cancellation token so
    /// stopping an agent interrupts an in-flight LLM call instead of
    /// waiting for it to finish (spec §5 "cancelled cooperatively").
    async fn decide_cancellably(
        &self,
        request: DecisionRequest,
        cancel: &CancellationToken,
    ) -> crate::error::OrkaResult<super::llm_fallback::DecisionResponse> {
        tokio::select! {
            _ = cancel.cancelled() => Err(crate::error::OrkaError::Cancellation),
            result = self.decision_maker.decide(request) => result,
        }
    }

    async fn handle_hook(&self, event: StampedHookEvent, history: &mut VecDeque<String>, cancel: &CancellationToken) {
        let kind = event.raw.kind();
        let Some(agent) = self.store.agents.get(&self.agent.id).await else { return };
        if !agent.enabled_hooks.is_enabled(kind) {
            return;
        }
        let Some(pane) = self.resolve_pane().await else { return };
        let Some(terminal_text) = self.capture(&pane).await else { return };
        let terminal = terminal_parser::classify(&self.patterns, &terminal_text);

        let (action, reason, notify) = match fast_path::evaluate(&event, kind, terminal, &agent.approval_policy) {
            Some(outcome) => (outcome.action, "fast_path".to_owned(), outcome.notify_chat),
            None => {
                let request = DecisionRequest {
                    event: serde_json::to_value(&event).unwrap_or(serde_json::Value::Null),
                    terminal_text: terminal_text.clone(),
                    history: history.iter().cloned().collect(),
                };
                match self.decide_cancellably(request, cancel).await {
                    Ok(response) => {
                        let reason = response.reason.clone();
                        (response.into_action(), reason, None)
                    }
                    Err(err) => {
                        warn!(agent_id = %self.agent.id, %err, "llm fallback failed, waiting");
                        (Action::Wait, "llm_fallback_unavailable".to_owned(), None)
                    }
                }
            }
        };

        self.execute(&pane, &action).await;
        self.push_log(DecisionLogEntry {
            timestamp: now_rfc3339(),
            source: format!("hook:{}", event.raw.event_type),
            terminal_state: terminal.as_str().to_owned(),
            action: action.as_str().to_owned(),
            reason,
        })
        .await;
        push_history(history, &format!("{}:{} -> {}", event.raw.event_type, terminal.as_str(), action.as_str()));

        if let Some(message) = notify.or_else(|| matches!(action, Action::RequestHelp).then(|| "agent needs help".to_owned())) {
            self.chat.notify(&self.agent.id, &message).await;
        }
    }

    async fn handle_watchdog(
        &self,
        history: &mut VecDeque<String>,
        idle_streak: &mut u32,
        last_verdict: &mut Option<Action>,
        verdict_streak: &mut u32,
        cancel: &CancellationToken,
    ) {
        let Some(pane) = self.resolve_pane().await else { return };
        let Some(terminal_text) = self.capture(&pane).await else { return };

        if terminal_parser::is_spinner_active(&terminal_text) {
            *idle_streak = 0;
            return;
        }
        let terminal = terminal_parser::classify(&self.patterns, &terminal_text);
        if terminal != TerminalState::Idle && terminal != TerminalState::Unknown {
            *idle_streak = 0;
            return;
        }

        *idle_streak += 1;
        if *idle_streak < self.watchdog_k {
            return;
        }

        let request = DecisionRequest {
            event: serde_json::json!({"eventType": "Watchdog"}),
            terminal_text: terminal_text.clone(),
            history: history.iter().cloned().collect(),
        };
        let response = match self.decide_cancellably(request, cancel).await {
            Ok(response) => response,
            Err(err) => {
                warn!(agent_id = %self.agent.id, %err, "watchdog llm call failed");
                return;
            }
        };
        let reason = response.reason.clone();
        let action = response.into_action();

        if last_verdict.as_ref() == Some(&action) {
            *verdict_streak += 1;
        } else {
            *last_verdict = Some(action.clone());
            *verdict_streak = 1;
        }

        if *verdict_streak < self.watchdog_m {
            self.push_log(DecisionLogEntry {
                timestamp: now_rfc3339(),
                source: "watchdog".to_owned(),
                terminal_state: terminal.as_str().to_owned(),
                action: format!("awaiting_confirmation({})", action.as_str()),
                reason,
            })
            .await;
            return;
        }

        self.execute(&pane, &action).await;
        self.push_log(DecisionLogEntry {
            timestamp: now_rfc3339(),
            source: "watchdog".to_owned(),
            terminal_state: terminal.as_str().to_owned(),
            action: action.as_str().to_owned(),
            reason,
        })
        .await;
        push_history(history, &format!("watchdog:{} -> {}", terminal.as_str(), action.as_str()));

        *idle_streak = 0;
        *verdict_streak = 0;
        *last_verdict = None;
    }

    async fn execute(&self, pane: &PaneId, action: &Action) {
        let result = match action {
            Action::Approve => self.orchestrator.send_line(pane, "1").await,
            Action::Reject => self.orchestrator.send_line(pane, "2").await,
            Action::Compact => self.orchestrator.send_line(pane, "/compact").await,
            Action::Clear => self.orchestrator.send_line(pane, "/clear").await,
            Action::Escape => self.orchestrator.send_escape(pane).await,
            Action::Respond(text) => self.orchestrator.send_line(pane, text).await,
            Action::Wait | Action::RequestHelp | Action::NotifyMilestone => Ok(()),
        };
        if let Err(err) = result {
            warn!(agent_id = %self.agent.id, %err, action = action.as_str(), "supervisor action failed");
        }
    }

    async fn push_log(&self, entry: DecisionLogEntry) {
        let mut log = self.decision_log.lock().await;
        if log.len() >= DECISION_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(entry);
    }
}

fn push_history(history: &mut VecDeque<String>, entry: &str) {
    if history.len() >= HISTORY_CAPACITY {
        history.pop_front();
    }
    history.push_back(entry.to_owned());
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
