// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Multiplexer`] fake for tests that exercise the orchestrator
//! and supervisor without a real tmux binary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MuxError, PaneId};
use crate::trait_def::Multiplexer;

#[derive(Default, Clone)]
struct PaneState {
    title: String,
    captured: String,
}

#[derive(Default)]
struct SessionState {
    panes: Vec<PaneId>,
    active: usize,
}

/// Deterministic, in-process stand-in for a real multiplexer.
///
/// Every method logs its call for assertions in
/// [`FakeMultiplexer::calls`]. Pane text returned by `capture_pane` can be
/// pre-seeded with [`FakeMultiplexer::set_pane_text`] so tests can drive
/// the terminal-state parser deterministically.
#[derive(Default)]
pub struct FakeMultiplexer {
    sessions: Mutex<HashMap<String, SessionState>>,
    panes: Mutex<HashMap<PaneId, PaneState>>,
    next_pane: AtomicU64,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call.into());
    }

    fn new_pane_id(&self) -> PaneId {
        let n = self.next_pane.fetch_add(1, Ordering::Relaxed);
        PaneId(format!("%{n}"))
    }

    /// Seed the text that `capture_pane` will return for a given pane.
    pub fn set_pane_text(&self, pane: &PaneId, text: impl Into<String>) {
        let mut panes = self.panes.lock().unwrap_or_else(|e| e.into_inner());
        panes.entry(pane.clone()).or_default().captured = text.into();
    }
}

#[async_trait]
impl Multiplexer for FakeMultiplexer {
    async fn session_exists(&self, name: &str) -> Result<bool, MuxError> {
        self.log(format!("session_exists({name})"));
        Ok(self.sessions.lock().unwrap_or_else(|e| e.into_inner()).contains_key(name))
    }

    async fn create_session(&self, name: &str, _cwd: &Path) -> Result<(), MuxError> {
        self.log(format!("create_session({name})"));
        let pane = self.new_pane_id();
        self.panes.lock().unwrap_or_else(|e| e.into_inner()).insert(pane.clone(), PaneState::default());
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(name.to_owned(), SessionState { panes: vec![pane], active: 0 });
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<(), MuxError> {
        self.log(format!("kill_session({name})"));
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = sessions.remove(name) {
            let mut panes = self.panes.lock().unwrap_or_else(|e| e.into_inner());
            for pane in session.panes {
                panes.remove(&pane);
            }
        }
        Ok(())
    }

    async fn split_pane(&self, name: &str, _vertical: bool) -> Result<PaneId, MuxError> {
        self.log(format!("split_pane({name})"));
        let pane = self.new_pane_id();
        self.panes.lock().unwrap_or_else(|e| e.into_inner()).insert(pane.clone(), PaneState::default());
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get_mut(name).ok_or_else(|| MuxError::NotFound(name.to_owned()))?;
        session.panes.push(pane.clone());
        session.active = session.panes.len() - 1;
        Ok(pane)
    }

    async fn kill_pane(&self, pane: &PaneId) -> Result<(), MuxError> {
        self.log(format!("kill_pane({pane})"));
        self.panes.lock().unwrap_or_else(|e| e.into_inner()).remove(pane);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        for session in sessions.values_mut() {
            session.panes.retain(|p| p != pane);
        }
        Ok(())
    }

    async fn list_panes(&self, name: &str) -> Result<Vec<PaneId>, MuxError> {
        self.log(format!("list_panes({name})"));
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get(name).ok_or_else(|| MuxError::NotFound(name.to_owned()))?;
        Ok(session.panes.clone())
    }

    async fn get_main_pane(&self, name: &str) -> Result<PaneId, MuxError> {
        self.log(format!("get_main_pane({name})"));
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get(name).ok_or_else(|| MuxError::NotFound(name.to_owned()))?;
        session.panes.first().cloned().ok_or_else(|| MuxError::NotFound(name.to_owned()))
    }

    async fn set_pane_title(&self, pane: &PaneId, title: &str) -> Result<(), MuxError> {
        self.log(format!("set_pane_title({pane}, {title})"));
        let mut panes = self.panes.lock().unwrap_or_else(|e| e.into_inner());
        let state = panes.get_mut(pane).ok_or_else(|| MuxError::NotFound(pane.to_string()))?;
        state.title = title.to_owned();
        Ok(())
    }

    async fn send_keys(&self, pane: &PaneId, text: &str) -> Result<(), MuxError> {
        self.log(format!("send_keys({pane}, {text:?})"));
        if !self.panes.lock().unwrap_or_else(|e| e.into_inner()).contains_key(pane) {
            return Err(MuxError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn send_enter(&self, pane: &PaneId) -> Result<(), MuxError> {
        self.log(format!("send_enter({pane})"));
        if !self.panes.lock().unwrap_or_else(|e| e.into_inner()).contains_key(pane) {
            return Err(MuxError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(&self, pane: &PaneId, lines: u32) -> Result<String, MuxError> {
        self.log(format!("capture_pane({pane}, {lines})"));
        let panes = self.panes.lock().unwrap_or_else(|e| e.into_inner());
        let state = panes.get(pane).ok_or_else(|| MuxError::NotFound(pane.to_string()))?;
        Ok(state.captured.clone())
    }

    async fn select_pane(&self, pane: &PaneId) -> Result<(), MuxError> {
        self.log(format!("select_pane({pane})"));
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        for session in sessions.values_mut() {
            if let Some(idx) = session.panes.iter().position(|p| p == pane) {
                session.active = idx;
            }
        }
        Ok(())
    }

    async fn get_active_pane(&self, name: &str) -> Result<PaneId, MuxError> {
        self.log(format!("get_active_pane({name})"));
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get(name).ok_or_else(|| MuxError::NotFound(name.to_owned()))?;
        session
            .panes
            .get(session.active)
            .cloned()
            .ok_or_else(|| MuxError::NotFound(name.to_owned()))
    }
}
