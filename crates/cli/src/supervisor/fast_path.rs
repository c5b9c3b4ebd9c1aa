// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The deterministic `(event × terminal state) -> action` table (spec
//! §4.5 step 5). Tried before any LLM call; falls through to
//! `llm_fallback` when no rule matches.

use crate::event::{HookEventKind, StampedHookEvent};
use crate::store::ApprovalPolicy;

use super::terminal_parser::TerminalState;

/// An action the supervisor can take, shared between the fast path and
/// the LLM fallback (spec §4.5's seven-member fallback action set plus
/// `NotifyMilestone`, which the fast path alone produces since it has no
/// pane-level effect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    Compact,
    Clear,
    Escape,
    Wait,
    RequestHelp,
    Respond(String),
    /// Notify chat only — no terminal action (the "idle right after Stop"
    /// rule).
    NotifyMilestone,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Compact => "compact",
            Self::Clear => "clear",
            Self::Escape => "escape",
            Self::Wait => "wait",
            Self::RequestHelp => "request_help",
            Self::Respond(_) => "respond",
            Self::NotifyMilestone => "notify_milestone",
        }
    }
}

/// Result of a fast-path match: the action to execute plus an optional
/// chat notification to send alongside it.
pub struct FastPathOutcome {
    pub action: Action,
    pub notify_chat: Option<String>,
}

/// Evaluate the fast path for one hook event. Returns `None` if no
/// deterministic rule matches, signalling the caller should fall back to
/// the LLM decision maker.
pub fn evaluate(
    event: &StampedHookEvent,
    kind: HookEventKind,
    terminal: TerminalState,
    policy: &ApprovalPolicy,
) -> Option<FastPathOutcome> {
    match (kind, terminal) {
        (HookEventKind::Permission, TerminalState::PermissionPrompt)
        | (HookEventKind::PreToolUse, TerminalState::PermissionPrompt)
        | (HookEventKind::PostToolUse, TerminalState::PermissionPrompt) => {
            let tool = event.raw.tool.as_deref().unwrap_or("");
            match policy.decision_for_tool(tool) {
                Some(true) => Some(FastPathOutcome { action: Action::Approve, notify_chat: None }),
                Some(false) => Some(FastPathOutcome {
                    action: Action::Reject,
                    notify_chat: Some(format!("Denied permission request for tool `{tool}` per policy")),
                }),
                None => None,
            }
        }
        (_, TerminalState::ContextWarning) => {
            Some(FastPathOutcome { action: Action::Compact, notify_chat: None })
        }
        (HookEventKind::Stop, TerminalState::Idle) => Some(FastPathOutcome {
            action: Action::NotifyMilestone,
            notify_chat: Some("session is idle after Stop".to_owned()),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn event(kind: &str, tool: Option<&str>) -> StampedHookEvent {
        StampedHookEvent {
            agent_id: "a1".into(),
            project_path: "/tmp/demo".into(),
            orka_session_id: "s1".into(),
            raw: crate::event::RawHookEvent {
                event_type: kind.to_owned(),
                timestamp: Some("2026-01-01T00:00:00Z".into()),
                cwd: None,
                session_id: None,
                tool: tool.map(|t| t.to_owned()),
                raw_stdin: None,
                extra: Map::new(),
            },
        }
    }

    #[test]
    fn approves_when_policy_allows_tool() {
        let policy = ApprovalPolicy { auto_approve_tools: vec!["edit".into()], auto_deny_tools: vec![] };
        let ev = event("Permission", Some("edit"));
        let outcome =
            evaluate(&ev, HookEventKind::Permission, TerminalState::PermissionPrompt, &policy).unwrap();
        assert_eq!(outcome.action, Action::Approve);
    }

    #[test]
    fn rejects_and_notifies_when_policy_denies() {
        let policy = ApprovalPolicy { auto_approve_tools: vec![], auto_deny_tools: vec!["bash".into()] };
        let ev = event("Permission", Some("bash"));
        let outcome =
            evaluate(&ev, HookEventKind::Permission, TerminalState::PermissionPrompt, &policy).unwrap();
        assert_eq!(outcome.action, Action::Reject);
        assert!(outcome.notify_chat.is_some());
    }

    #[test]
    fn unknown_tool_defers_to_llm() {
        let policy = ApprovalPolicy::default();
        let ev = event("Permission", Some("write"));
        assert!(evaluate(&ev, HookEventKind::Permission, TerminalState::PermissionPrompt, &policy).is_none());
    }

    #[test]
    fn context_warning_always_compacts() {
        let policy = ApprovalPolicy::default();
        let ev = event("Notification", None);
        let outcome =
            evaluate(&ev, HookEventKind::Notification, TerminalState::ContextWarning, &policy).unwrap();
        assert_eq!(outcome.action, Action::Compact);
    }

    #[test]
    fn idle_after_stop_notifies_milestone_only() {
        let policy = ApprovalPolicy::default();
        let ev = event("Stop", None);
        let outcome = evaluate(&ev, HookEventKind::Stop, TerminalState::Idle, &policy).unwrap();
        assert_eq!(outcome.action, Action::NotifyMilestone);
    }
}
