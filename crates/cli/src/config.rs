// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Orchestrates assistant sessions, their branches, and the supervisors
/// that drive them.
#[derive(Debug, Clone, Parser)]
#[command(name = "orka", version, about)]
pub struct Config {
    /// HTTP port for the control surface (projects, sessions, forks).
    #[arg(long, env = "ORKA_PORT", default_value = "4317")]
    pub port: u16,

    /// HTTP port for the hook receiver. Kept separate from `--port` so it
    /// can be enabled/disabled independently of the control surface.
    #[arg(long, env = "ORKA_HOOK_PORT", default_value = "4318")]
    pub hook_port: u16,

    /// Host address to bind both listeners to.
    #[arg(long, env = "ORKA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bearer token required by the control surface. No auth if unset.
    #[arg(long, env = "ORKA_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Path to the multiplexer binary (tmux-compatible).
    #[arg(long, env = "ORKA_MUX_BIN", default_value = "tmux")]
    pub mux_bin: String,

    /// Base port the web-terminal bridge scans upward from.
    #[arg(long, env = "ORKA_BRIDGE_BASE_PORT", default_value = "4400")]
    pub bridge_base_port: u16,

    /// Endpoint for the external LLM decision maker. Required for the
    /// event state machine's fallback path; fast-path-only operation is
    /// still possible without it (fallback requests simply fail closed
    /// to `wait`).
    #[arg(long, env = "ORKA_LLM_ENDPOINT")]
    pub llm_endpoint: Option<String>,

    /// LLM call timeout in seconds.
    #[arg(long, env = "ORKA_LLM_TIMEOUT", default_value = "20")]
    pub llm_timeout_secs: u64,

    /// Webhook URL the chat notifier posts to. No-op notifier if unset.
    #[arg(long, env = "ORKA_CHAT_WEBHOOK")]
    pub chat_webhook: Option<String>,

    /// Watchdog re-evaluation cadence in seconds.
    #[arg(long, env = "ORKA_WATCHDOG_INTERVAL", default_value = "30")]
    pub watchdog_interval_secs: u64,

    /// Consecutive idle/unknown ticks before the watchdog escalates to the
    /// LLM fallback.
    #[arg(long, env = "ORKA_WATCHDOG_K", default_value = "2")]
    pub watchdog_k: u32,

    /// Consecutive matching LLM verdicts required before the watchdog acts.
    #[arg(long, env = "ORKA_WATCHDOG_M", default_value = "2")]
    pub watchdog_m: u32,

    /// Default wait before auto-merge, in seconds.
    #[arg(long, env = "ORKA_AUTO_MERGE_WAIT", default_value = "15")]
    pub auto_merge_wait_secs: u64,

    /// Number of trailing pane lines captured for state parsing.
    #[arg(long, env = "ORKA_CAPTURE_LINES", default_value = "200")]
    pub capture_lines: u32,

    /// Log format: json or text.
    #[arg(long, env = "ORKA_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ORKA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Override the per-user config directory (defaults to `~/.orka`).
    #[arg(long, env = "ORKA_HOME")]
    pub orka_home: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == self.hook_port {
            anyhow::bail!("--port and --hook-port must differ");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn auto_merge_wait(&self) -> Duration {
        Duration::from_secs(self.auto_merge_wait_secs)
    }

    /// Directory holding the per-user project registry (`config.json`).
    pub fn home_dir(&self) -> PathBuf {
        self.orka_home.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(".orka")
        })
    }

    /// Directory holding the per-user agent registry (`agents.json`).
    ///
    /// Sibling of [`Config::home_dir`], named `<home>-agents` under an
    /// `--orka-home` override so tests can isolate both registries under
    /// one temp root.
    pub fn agents_dir(&self) -> PathBuf {
        match &self.orka_home {
            Some(home) => {
                let mut name = home.file_name().unwrap_or_default().to_os_string();
                name.push("-agents");
                home.with_file_name(name)
            }
            None => {
                let home = std::env::var("HOME").unwrap_or_default();
                PathBuf::from(home).join(".orka-agents")
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
