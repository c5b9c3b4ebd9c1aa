// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound chat notifications for agent milestones (spec §4.5's
//! `notify_chat` hook, §4.6 "webhook per agent, falling back to a global
//! default"). `WebhookChatNotifier` posts a small JSON envelope via
//! `reqwest`; best-effort only, a failed delivery is logged and swallowed
//! since a chat ping is never allowed to block the supervisor loop.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
struct ChatPayload<'a> {
    text: &'a str,
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn notify(&self, agent_id: &str, message: &str);
}

pub struct NoopChatNotifier;

#[async_trait]
impl ChatNotifier for NoopChatNotifier {
    async fn notify(&self, _agent_id: &str, _message: &str) {}
}

pub struct WebhookChatNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookChatNotifier {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl ChatNotifier for WebhookChatNotifier {
    async fn notify(&self, agent_id: &str, message: &str) {
        let payload = ChatPayload { text: message };
        let result = self
            .client
            .post(&self.url)
            .timeout(std::time::Duration::from_secs(10))
            .json(&payload)
            .send()
            .await;
        if let Err(err) = result {
            warn!(agent_id, %err, "chat notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_notifier_does_nothing_observable() {
        let notifier = NoopChatNotifier;
        notifier.notify("agent-1", "hello").await;
    }
}
