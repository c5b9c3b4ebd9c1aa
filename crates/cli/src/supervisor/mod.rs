// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C4: per-agent event state machine and watchdog. One [`AgentSupervisor`]
//! task per running agent, draining its inbound queue strictly in arrival
//! order (spec §4.5, §5 "per agent" ordering guarantee) and a sibling
//! watchdog timer that injects synthetic ticks onto the same queue so it
//! can never bypass a real event.
//!
//! Grounded on the teacher's single-session `Session::run` select-loop
//! (`session/run.rs`), restructured here to one loop per *agent* draining
//! hook events rather than one loop per process draining PTY bytes.

pub mod agent;
pub mod chat;
pub mod fast_path;
pub mod llm_fallback;
pub mod terminal_parser;
pub mod watchdog;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{OrkaError, OrkaResult};
use crate::event::StampedHookEvent;
use crate::orchestrator::Orchestrator;
use crate::store::{AgentConfig, AppStore};

pub use agent::DecisionLogEntry;
pub use chat::{ChatNotifier, NoopChatNotifier, WebhookChatNotifier};
pub use llm_fallback::{DecisionMaker, HttpDecisionMaker, NoopDecisionMaker};
pub use terminal_parser::TerminalPatterns;

/// Message delivered to a single agent's serial event loop. `Stop` is an
/// explicit poison token rather than relying on the sender being dropped,
/// so an in-flight LLM call observes the agent's cancellation token
/// promptly instead of only discovering a closed channel on its next poll
/// (spec §4.5 "Cancellation").
pub(crate) enum AgentMsg {
    Hook(StampedHookEvent),
    Watchdog,
    Stop,
}

struct AgentHandle {
    tx: mpsc::Sender<AgentMsg>,
    cancel: CancellationToken,
    decision_log: Arc<Mutex<VecDeque<DecisionLogEntry>>>,
}

const DECISION_LOG_CAPACITY: usize = 200;
const INBOUND_QUEUE_CAPACITY: usize = 256;

/// Process-wide registry of running agent supervisors, keyed by agent id.
/// Constructed explicitly at startup (spec §9 "no lazy `getInstance`") and
/// handed down to the hook receiver and control surface.
pub struct SupervisorRegistry {
    store: Arc<AppStore>,
    orchestrator: Arc<Orchestrator>,
    decision_maker: Arc<dyn DecisionMaker>,
    chat_notifier_factory: Box<dyn Fn(Option<&str>) -> Arc<dyn ChatNotifier> + Send + Sync>,
    patterns: Arc<TerminalPatterns>,
    watchdog_k: u32,
    watchdog_m: u32,
    capture_lines: u32,
    handles: RwLock<HashMap<String, AgentHandle>>,
}

impl SupervisorRegistry {
    /// Compiles the terminal-state regex set once (spec §4.5 step 4);
    /// every agent supervisor started from this registry shares the same
    /// compiled patterns rather than re-compiling them per agent.
    pub fn new(
        store: Arc<AppStore>,
        orchestrator: Arc<Orchestrator>,
        decision_maker: Arc<dyn DecisionMaker>,
        config: &Config,
    ) -> Result<Self, regex::Error> {
        let default_webhook = config.chat_webhook.clone();
        let chat_notifier_factory: Box<dyn Fn(Option<&str>) -> Arc<dyn ChatNotifier> + Send + Sync> =
            Box::new(move |per_agent: Option<&str>| -> Arc<dyn ChatNotifier> {
                match per_agent.or(default_webhook.as_deref()) {
                    Some(url) => Arc::new(WebhookChatNotifier::new(url.to_owned())),
                    None => Arc::new(NoopChatNotifier),
                }
            });
        Ok(Self {
            store,
            orchestrator,
            decision_maker,
            chat_notifier_factory,
            patterns: Arc::new(TerminalPatterns::compile()?),
            watchdog_k: config.watchdog_k,
            watchdog_m: config.watchdog_m,
            capture_lines: config.capture_lines,
            handles: RwLock::new(HashMap::new()),
        })
    }

    /// Start (or restart) the supervisor task + watchdog timer for an
    /// agent already present in the agent registry.
    pub async fn start_agent(&self, agent: AgentConfig) -> OrkaResult<()> {
        self.stop_agent(&agent.id).await;

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        let decision_log = Arc::new(Mutex::new(VecDeque::with_capacity(DECISION_LOG_CAPACITY)));
        let chat = (self.chat_notifier_factory)(agent.chat_credentials.as_deref());

        let watchdog_interval = std::time::Duration::from_secs(agent.watchdog_interval_secs.max(1));
        let supervisor = agent::AgentSupervisor::new(
            agent.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.decision_maker),
            chat,
            Arc::clone(&decision_log),
            Arc::clone(&self.patterns),
            self.watchdog_k,
            self.watchdog_m,
            self.capture_lines,
        );

        let watchdog_tx = tx.clone();
        let watchdog_cancel = cancel.clone();
        tokio::spawn(watchdog::run_watchdog_timer(watchdog_tx, watchdog_interval, watchdog_cancel));

        let run_cancel = cancel.clone();
        tokio::spawn(async move {
            supervisor.run(rx, run_cancel).await;
        });

        self.handles
            .write()
            .await
            .insert(agent.id.clone(), AgentHandle { tx, cancel, decision_log });
        self.store.agents.set_running(&agent.id, true).await.map_err(OrkaError::External)?;
        info!(agent_id = %agent.id, "agent supervisor started");
        Ok(())
    }

    /// Stop an agent's supervisor: cancel in-flight LLM calls and the
    /// watchdog timer, then poison the queue so the loop exits after
    /// draining anything already enqueued.
    pub async fn stop_agent(&self, agent_id: &str) {
        let handle = self.handles.write().await.remove(agent_id);
        if let Some(handle) = handle {
            handle.cancel.cancel();
            let _ = handle.tx.send(AgentMsg::Stop).await;
        }
        let _ = self.store.agents.set_running(agent_id, false).await;
    }

    /// Push a normalized hook event onto an agent's inbound queue.
    /// Returns `NotFound` if the agent isn't currently running — the hook
    /// receiver maps that to its own 404.
    pub async fn dispatch(&self, agent_id: &str, event: StampedHookEvent) -> OrkaResult<()> {
        let handles = self.handles.read().await;
        let Some(handle) = handles.get(agent_id) else {
            return Err(OrkaError::NotFound(format!("agent {agent_id}")));
        };
        if handle.tx.send(AgentMsg::Hook(event)).await.is_err() {
            warn!(agent_id, "agent queue closed, dropping event");
        }
        Ok(())
    }

    pub async fn is_running(&self, agent_id: &str) -> bool {
        self.handles.read().await.contains_key(agent_id)
    }

    /// Read-only snapshot of an agent's decision log, newest last, for the
    /// `GET /api/agents/:id/log` control-surface endpoint.
    pub async fn decision_log(&self, agent_id: &str) -> OrkaResult<Vec<DecisionLogEntry>> {
        let handles = self.handles.read().await;
        let handle =
            handles.get(agent_id).ok_or_else(|| OrkaError::NotFound(format!("agent {agent_id}")))?;
        Ok(handle.decision_log.lock().await.iter().cloned().collect())
    }
}
