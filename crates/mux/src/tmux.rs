// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default [`Multiplexer`] implementation: shells out to a tmux-compatible
//! binary via `tokio::process::Command`. One subprocess per call — the
//! adapter keeps no handle open between calls, matching the "stateless"
//! contract.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MuxError, PaneId};
use crate::retry::{retry_read, run_write};
use crate::Multiplexer;

const READ_ATTEMPTS: u32 = 3;

/// Shells out to `tmux` (or a compatible binary named by `bin`) for every
/// operation. The binary name is configurable so the specific multiplexer
/// in use is irrelevant to callers.
pub struct TmuxMultiplexer {
    bin: String,
}

impl TmuxMultiplexer {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for TmuxMultiplexer {
    fn default() -> Self {
        Self::new("tmux")
    }
}

struct Output {
    stdout: String,
}

impl TmuxMultiplexer {
    async fn run(&self, args: &[&str]) -> Result<Output, MuxError> {
        debug!(bin = %self.bin, args = ?args, "mux: running command");
        let output = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MuxError::Unavailable(self.bin.clone())
                } else {
                    MuxError::Io(e)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            if stderr.contains("can't find") || stderr.contains("session not found") {
                return Err(MuxError::NotFound(stderr.trim().to_owned()));
            }
            return Err(MuxError::CommandFailed {
                command: format!("{} {}", self.bin, args.join(" ")),
                code: output.status.code(),
                stderr: stderr.trim().to_owned(),
            });
        }

        Ok(Output { stdout })
    }
}

#[async_trait]
impl Multiplexer for TmuxMultiplexer {
    async fn session_exists(&self, name: &str) -> Result<bool, MuxError> {
        retry_read(READ_ATTEMPTS, || async {
            match self.run(&["has-session", "-t", name]).await {
                Ok(_) => Ok(true),
                Err(MuxError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn create_session(&self, name: &str, cwd: &Path) -> Result<(), MuxError> {
        let cwd_str = cwd.to_string_lossy();
        self.run(&["new-session", "-d", "-s", name, "-c", &cwd_str]).await?;
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        match self.run(&["kill-session", "-t", name]).await {
            Ok(_) => Ok(()),
            Err(MuxError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn split_pane(&self, name: &str, vertical: bool) -> Result<PaneId, MuxError> {
        let flag = if vertical { "-v" } else { "-h" };
        let out = self.run(&["split-window", flag, "-t", name, "-P", "-F", "#{pane_id}"]).await?;
        Ok(PaneId(out.stdout.trim().to_owned()))
    }

    async fn kill_pane(&self, pane: &PaneId) -> Result<(), MuxError> {
        match self.run(&["kill-pane", "-t", &pane.0]).await {
            Ok(_) => Ok(()),
            Err(MuxError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list_panes(&self, name: &str) -> Result<Vec<PaneId>, MuxError> {
        retry_read(READ_ATTEMPTS, || async {
            let out = self.run(&["list-panes", "-t", name, "-F", "#{pane_id}"]).await?;
            Ok(out.stdout.lines().map(|l| PaneId(l.trim().to_owned())).collect())
        })
        .await
    }

    async fn get_main_pane(&self, name: &str) -> Result<PaneId, MuxError> {
        retry_read(READ_ATTEMPTS, || async {
            let out = self
                .run(&["list-panes", "-t", name, "-F", "#{pane_id} #{pane_index}"])
                .await?;
            out.stdout
                .lines()
                .filter_map(|l| {
                    let mut parts = l.split_whitespace();
                    let id = parts.next()?;
                    let idx: u32 = parts.next()?.parse().ok()?;
                    Some((id.to_owned(), idx))
                })
                .min_by_key(|(_, idx)| *idx)
                .map(|(id, _)| PaneId(id))
                .ok_or_else(|| MuxError::NotFound(name.to_owned()))
        })
        .await
    }

    async fn set_pane_title(&self, pane: &PaneId, title: &str) -> Result<(), MuxError> {
        self.run(&["select-pane", "-t", &pane.0, "-T", title]).await?;
        Ok(())
    }

    async fn send_keys(&self, pane: &PaneId, text: &str) -> Result<(), MuxError> {
        // `-l` sends the text literally, bypassing tmux's key-name parsing.
        run_write(self.run(&["send-keys", "-t", &pane.0, "-l", text])).await?;
        Ok(())
    }

    async fn send_enter(&self, pane: &PaneId) -> Result<(), MuxError> {
        run_write(self.run(&["send-keys", "-t", &pane.0, "Enter"])).await?;
        Ok(())
    }

    async fn capture_pane(&self, pane: &PaneId, lines: u32) -> Result<String, MuxError> {
        retry_read(READ_ATTEMPTS, || async {
            let start = format!("-{lines}");
            let out = self.run(&["capture-pane", "-p", "-t", &pane.0, "-S", &start]).await?;
            Ok(out.stdout)
        })
        .await
    }

    async fn select_pane(&self, pane: &PaneId) -> Result<(), MuxError> {
        self.run(&["select-pane", "-t", &pane.0]).await?;
        Ok(())
    }

    async fn get_active_pane(&self, name: &str) -> Result<PaneId, MuxError> {
        retry_read(READ_ATTEMPTS, || async {
            let out = self
                .run(&["list-panes", "-t", name, "-F", "#{pane_id} #{pane_active}"])
                .await?;
            out.stdout
                .lines()
                .find_map(|l| {
                    let mut parts = l.split_whitespace();
                    let id = parts.next()?;
                    let active = parts.next()?;
                    (active == "1").then(|| PaneId(id.to_owned()))
                })
                .ok_or_else(|| MuxError::NotFound(name.to_owned()))
        })
        .await
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
