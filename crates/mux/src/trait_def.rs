// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use async_trait::async_trait;

use crate::error::{MuxError, PaneId};

/// Stateless adapter over an external terminal multiplexer.
///
/// Every method shells out to the multiplexer binary and returns; the
/// adapter retains no state between calls (the multiplexer server is the
/// source of truth). Implementors retry transient failures internally
/// (see [`crate::retry`]); callers only ever see a terminal success or
/// error.
///
/// Object-safe so callers can hold `Arc<dyn Multiplexer>` and swap in a
/// fake implementation in tests.
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Whether a multiplexer session with this name currently exists.
    async fn session_exists(&self, name: &str) -> Result<bool, MuxError>;

    /// Create a detached multiplexer session rooted at `cwd`.
    async fn create_session(&self, name: &str, cwd: &Path) -> Result<(), MuxError>;

    /// Kill a multiplexer session and every pane inside it.
    async fn kill_session(&self, name: &str) -> Result<(), MuxError>;

    /// Split the session's currently active pane, returning the new pane's id.
    async fn split_pane(&self, name: &str, vertical: bool) -> Result<PaneId, MuxError>;

    /// Kill a single pane. Not an error if the pane is already gone.
    async fn kill_pane(&self, pane: &PaneId) -> Result<(), MuxError>;

    /// List every pane id that belongs to a session.
    async fn list_panes(&self, name: &str) -> Result<Vec<PaneId>, MuxError>;

    /// The id of the session's original (root) pane.
    async fn get_main_pane(&self, name: &str) -> Result<PaneId, MuxError>;

    /// Set a pane's displayed title.
    async fn set_pane_title(&self, pane: &PaneId, title: &str) -> Result<(), MuxError>;

    /// Write raw text into a pane, without a trailing newline.
    async fn send_keys(&self, pane: &PaneId, text: &str) -> Result<(), MuxError>;

    /// Send a bare Enter keystroke to a pane.
    async fn send_enter(&self, pane: &PaneId) -> Result<(), MuxError>;

    /// Capture the last `lines` lines of rendered pane text.
    async fn capture_pane(&self, pane: &PaneId, lines: u32) -> Result<String, MuxError>;

    /// Focus a pane (bring it to the foreground of its window).
    async fn select_pane(&self, pane: &PaneId) -> Result<(), MuxError>;

    /// The id of the pane currently focused within a session.
    async fn get_active_pane(&self, name: &str) -> Result<PaneId, MuxError>;
}
