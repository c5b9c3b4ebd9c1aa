// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook event wire format and the closed set of event types the
//! supervisor's fast path recognizes. Modeled as a tagged variant over
//! the known types; an unrecognized `event_type` string collapses into
//! `Error` rather than being rejected — the fast path has no rule for
//! `Error` either, so both cases defer identically to the LLM fallback
//! (spec §6's hook-surface table already routes `Error` there), giving
//! the same forward-compatible behavior as a dedicated `Unknown` variant
//! without adding one.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// As received over the wire at `POST /hooks/:agent_id`, before
/// normalization. Unknown fields are preserved in `extra` so the LLM
/// fallback can see the full original payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHookEvent {
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub raw_stdin: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

impl RawHookEvent {
    /// Build the fallback envelope used when the request body fails to
    /// parse as JSON: `{event_type: "Stop", raw_stdin: <text>, timestamp: now}`.
    pub fn from_raw_text(text: &str) -> Self {
        Self {
            event_type: "Stop".to_owned(),
            timestamp: Some(now_rfc3339()),
            cwd: None,
            session_id: None,
            tool: None,
            raw_stdin: Some(text.to_owned()),
            extra: Map::new(),
        }
    }

    /// Fill in a missing timestamp with "now".
    pub fn with_timestamp_filled(mut self) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(now_rfc3339());
        }
        self
    }

    pub fn kind(&self) -> HookEventKind {
        HookEventKind::classify(&self.event_type)
    }
}

/// The closed set of hook event types the fast path dispatches on, plus an
/// `Unknown` catch-all carrying the raw type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventKind {
    SessionStart,
    Stop,
    Notification,
    PreToolUse,
    PostToolUse,
    PreCompact,
    Permission,
    UserPromptSubmit,
    Subagent,
    Error,
}

impl HookEventKind {
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            "SessionStart" => Self::SessionStart,
            "Stop" => Self::Stop,
            "Notification" => Self::Notification,
            "PreToolUse" => Self::PreToolUse,
            "PostToolUse" => Self::PostToolUse,
            "PreCompact" => Self::PreCompact,
            "Permission" => Self::Permission,
            "UserPromptSubmit" => Self::UserPromptSubmit,
            "Error" => Self::Error,
            other if other.starts_with("Subagent") => Self::Subagent,
            _ => Self::Error,
        }
    }
}

/// A hook event after normalization: stamped with the routing metadata the
/// receiver resolves (agent id, project path, orka session id) and ready
/// to be pushed onto an agent's inbound queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampedHookEvent {
    pub agent_id: String,
    pub project_path: String,
    pub orka_session_id: String,
    #[serde(flatten)]
    pub raw: RawHookEvent,
}

fn now_rfc3339() -> String {
    let dur = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    epoch_to_rfc3339(dur.as_secs())
}

/// Minimal RFC3339 (UTC, second precision) formatter — avoids pulling
/// `chrono` into this crate for a single formatting call (see SPEC_FULL.md
/// ambient-stack notes on timestamps).
pub fn epoch_to_rfc3339(epoch_secs: u64) -> String {
    const DAYS_PER_400Y: i64 = 146097;
    const DAYS_PER_100Y: i64 = 36524;
    const DAYS_PER_4Y: i64 = 1461;

    let days = (epoch_secs / 86400) as i64;
    let secs_of_day = epoch_secs % 86400;

    // Civil-from-days algorithm (Howard Hinnant), proleptic Gregorian.
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - DAYS_PER_400Y + 1 } / DAYS_PER_400Y;
    let doe = (z - era * DAYS_PER_400Y) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    let hh = secs_of_day / 3600;
    let mm = (secs_of_day % 3600) / 60;
    let ss = secs_of_day % 60;

    let _ = DAYS_PER_100Y;
    let _ = DAYS_PER_4Y;

    format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z")
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
