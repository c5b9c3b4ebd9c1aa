// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure modes surfaced by the [`crate::Multiplexer`] trait.
///
/// A missing multiplexer binary is always fatal (`Unavailable`); any other
/// non-zero exit is reported up with the captured stderr so the caller can
/// decide whether to retry or propagate.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// The multiplexer binary itself could not be found or started (`ENOENT`).
    #[error("multiplexer binary unavailable: {0}")]
    Unavailable(String),

    /// The multiplexer ran but the requested pane/session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The multiplexer exited non-zero for a reason other than "not found".
    #[error("multiplexer command failed: {command} (exit {code:?}): {stderr}")]
    CommandFailed { command: String, code: Option<i32>, stderr: String },

    /// An I/O error occurred spawning or communicating with the subprocess.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MuxError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque pane identifier as returned by the multiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PaneId(pub String);

impl From<String> for PaneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaneId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
