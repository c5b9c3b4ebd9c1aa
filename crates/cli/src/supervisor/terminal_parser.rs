// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic classifier over captured pane text (spec §4.5 step 4).
//! Allow-listed substring/regex rules only — no heuristics that look at
//! content semantics. Grounded on the teacher's
//! `driver::claude::screen_detect`/`driver::screen_parse` pattern-based
//! classification, adapted to operate on `capturePane` text pulled through
//! the Multiplexer Adapter rather than an in-process screen model.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The closed set of terminal states the fast path and watchdog dispatch
/// on (spec §4.5, glossary "terminal state parser").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Idle,
    WaitingForInput,
    PermissionPrompt,
    Processing,
    ContextWarning,
    Error,
    Unknown,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForInput => "waiting_for_input",
            Self::PermissionPrompt => "permission_prompt",
            Self::Processing => "processing",
            Self::ContextWarning => "context_warning",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Compiled regex set used by [`classify`]. Built fallibly once at
/// supervisor startup and shared by every agent — the same shape as the
/// teacher's `compile_config` over `ScreenPatternConfig` (`driver::
/// screen_parse`). These patterns are fixed literals rather than
/// user-supplied config, but `[lints] workspace = true` denies
/// `clippy::expect_used` here exactly as it does for the teacher, so the
/// compile step returns a `Result` instead of asserting success.
pub struct TerminalPatterns {
    error: Regex,
    context_warning: Regex,
    permission_prompt: Regex,
    processing: Regex,
    waiting_for_input: Regex,
}

impl TerminalPatterns {
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            error: Regex::new(r"(?i)(error:|traceback|panic:|fatal:|unhandled exception)")?,
            context_warning: Regex::new(
                r"(?i)(context (left|window|low)|running low on context|auto-compact|approaching.*context limit)",
            )?,
            permission_prompt: Regex::new(
                r"(?i)(do you want to proceed|allow this action|would you like to (allow|proceed)|1\.\s*yes)",
            )?,
            processing: Regex::new(r"(?i)(thinking\.{3}|working\.{3}|generating\.{3}|esc to interrupt)")?,
            waiting_for_input: Regex::new(r"^\s*>\s*$")?,
        })
    }
}

const SPINNER_GLYPHS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const IDLE_PROMPT_GLYPH: char = '❯';

/// Classify captured pane text into the closed set of terminal states.
///
/// Priority, highest first: error > permission_prompt > context_warning >
/// processing > waiting_for_input > idle > unknown. Error takes precedence
/// because a prompt or spinner glyph can still be on-screen underneath a
/// freshly printed stack trace.
pub fn classify(patterns: &TerminalPatterns, text: &str) -> TerminalState {
    let lines: Vec<&str> = text.lines().collect();
    let last_non_empty = lines.iter().rev().find(|l| !l.trim().is_empty()).copied().unwrap_or("");

    if lines.iter().any(|l| patterns.error.is_match(l)) {
        return TerminalState::Error;
    }
    if lines.iter().any(|l| patterns.permission_prompt.is_match(l)) {
        return TerminalState::PermissionPrompt;
    }
    if lines.iter().any(|l| patterns.context_warning.is_match(l)) {
        return TerminalState::ContextWarning;
    }
    if is_spinner_active(text) || lines.iter().any(|l| patterns.processing.is_match(l)) {
        return TerminalState::Processing;
    }
    if patterns.waiting_for_input.is_match(last_non_empty) {
        return TerminalState::WaitingForInput;
    }
    if last_non_empty.trim_end().ends_with(IDLE_PROMPT_GLYPH) {
        return TerminalState::Idle;
    }
    TerminalState::Unknown
}

/// Whether an animated spinner glyph is currently on screen — the
/// watchdog skips its tick entirely in this case (spec §4.5 "Watchdog"
/// step 1) since a spinner means the assistant is actively working and a
/// synthetic tick would only add noise.
pub fn is_spinner_active(text: &str) -> bool {
    text.chars().any(|c| SPINNER_GLYPHS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> TerminalPatterns {
        TerminalPatterns::compile().unwrap()
    }

    #[test]
    fn patterns_compile() {
        assert!(TerminalPatterns::compile().is_ok());
    }

    #[test]
    fn detects_error() {
        assert_eq!(
            classify(&patterns(), "Traceback (most recent call last):\nKeyError: 'x'"),
            TerminalState::Error
        );
    }

    #[test]
    fn detects_permission_prompt() {
        assert_eq!(
            classify(&patterns(), "Do you want to proceed?\n1. Yes\n2. No"),
            TerminalState::PermissionPrompt
        );
    }

    #[test]
    fn detects_context_warning() {
        assert_eq!(
            classify(&patterns(), "Context left until auto-compact: 5%"),
            TerminalState::ContextWarning
        );
    }

    #[test]
    fn detects_processing_via_spinner() {
        assert_eq!(classify(&patterns(), "⠙ Thinking about your request"), TerminalState::Processing);
    }

    #[test]
    fn detects_idle_prompt() {
        assert_eq!(classify(&patterns(), "some output\n❯ "), TerminalState::Idle);
    }

    #[test]
    fn detects_waiting_for_input() {
        assert_eq!(classify(&patterns(), "some output\n> "), TerminalState::WaitingForInput);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(classify(&patterns(), "just some plain scrollback"), TerminalState::Unknown);
    }

    #[test]
    fn error_takes_priority_over_prompt_glyph() {
        assert_eq!(classify(&patterns(), "panic: out of bounds\n❯ "), TerminalState::Error);
    }
}
