// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The LLM fallback: a structured request/response pair exchanged with an
//! external decision maker when the fast path doesn't match (spec §4.5
//! step 6). `HttpDecisionMaker` posts JSON to a configurable endpoint via
//! `reqwest`, matching the teacher's use of `reqwest` for upstream calls;
//! `NoopDecisionMaker` fails closed to `Wait` when no endpoint is
//! configured (spec SPEC_FULL.md ambient-stack note).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OrkaError, OrkaResult};

use super::fast_path::Action;

/// What the LLM fallback sends the decision maker: the raw hook event,
/// the captured terminal text, and a short rolling history of prior
/// decisions for this agent (spec §4.5 "ask the decision maker ... with a
/// structured request `{ event, terminalText, history }`").
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest {
    pub event: serde_json::Value,
    pub terminal_text: String,
    pub history: Vec<String>,
}

/// The decision maker's structured reply (spec §4.5: `{ action, response?,
/// reason }`).
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionResponse {
    pub action: DecisionAction,
    #[serde(default)]
    pub response: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Respond,
    Approve,
    Reject,
    Wait,
    RequestHelp,
    Compact,
    Clear,
    Escape,
}

impl DecisionResponse {
    pub fn into_action(self) -> Action {
        match self.action {
            DecisionAction::Respond => Action::Respond(self.response.unwrap_or_default()),
            DecisionAction::Approve => Action::Approve,
            DecisionAction::Reject => Action::Reject,
            DecisionAction::Wait => Action::Wait,
            DecisionAction::RequestHelp => Action::RequestHelp,
            DecisionAction::Compact => Action::Compact,
            DecisionAction::Clear => Action::Clear,
            DecisionAction::Escape => Action::Escape,
        }
    }
}

/// External decision-making backend. Object-safe so the supervisor can
/// hold `Arc<dyn DecisionMaker>` and swap in a fake for tests, the same
/// pattern as `orka_mux::Multiplexer`.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(&self, request: DecisionRequest) -> OrkaResult<DecisionResponse>;
}

/// Fails closed to `Wait` — used when no `--llm-endpoint` is configured,
/// so fast-path-only operation is still possible (SPEC_FULL.md's ambient
/// config note).
pub struct NoopDecisionMaker;

#[async_trait]
impl DecisionMaker for NoopDecisionMaker {
    async fn decide(&self, _request: DecisionRequest) -> OrkaResult<DecisionResponse> {
        Ok(DecisionResponse {
            action: DecisionAction::Wait,
            response: None,
            reason: "no LLM endpoint configured".to_owned(),
        })
    }
}

/// Default decision maker: one POST per request, 20s timeout (configurable),
/// one retry on transient network error only (spec §5 "Timeouts").
pub struct HttpDecisionMaker {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

/// Whether a failed call is worth retrying. Connect failures, timeouts,
/// and other request-level errors never reached the server and may
/// succeed on a second attempt; a non-2xx status or a malformed response
/// body is the server's final word and retrying it would just repeat the
/// same answer.
enum PostError {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

impl HttpDecisionMaker {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), endpoint, timeout }
    }

    async fn post_once(&self, request: &DecisionRequest) -> Result<DecisionResponse, PostError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| PostError::Transient(e.into()))?;

        let response = response.error_for_status().map_err(|e| {
            if e.status().is_some_and(|s| s.is_server_error()) {
                PostError::Transient(e.into())
            } else {
                PostError::Permanent(e.into())
            }
        })?;

        response.json::<DecisionResponse>().await.map_err(|e| PostError::Permanent(e.into()))
    }
}

#[async_trait]
impl DecisionMaker for HttpDecisionMaker {
    async fn decide(&self, request: DecisionRequest) -> OrkaResult<DecisionResponse> {
        match self.post_once(&request).await {
            Ok(resp) => Ok(resp),
            Err(PostError::Permanent(err)) => Err(OrkaError::External(err)),
            Err(PostError::Transient(_first_err)) => {
                // One retry with a small jittered delay, transient errors only.
                let jitter = Duration::from_millis(50 + rand::random::<u64>() % 150);
                tokio::time::sleep(jitter).await;
                match self.post_once(&request).await {
                    Ok(resp) => Ok(resp),
                    Err(PostError::Transient(e)) | Err(PostError::Permanent(e)) => Err(OrkaError::External(e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_always_waits() {
        let maker = NoopDecisionMaker;
        let response = maker
            .decide(DecisionRequest {
                event: serde_json::json!({}),
                terminal_text: String::new(),
                history: vec![],
            })
            .await
            .unwrap();
        assert_eq!(response.action, DecisionAction::Wait);
    }

    #[test]
    fn response_maps_actions() {
        let resp = DecisionResponse {
            action: DecisionAction::Respond,
            response: Some("ok".into()),
            reason: "r".into(),
        };
        assert_eq!(resp.into_action(), Action::Respond("ok".into()));
    }
}
